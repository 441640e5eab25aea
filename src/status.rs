//! Status snapshot persistence
//!
//! The trading loop rewrites `bot-status.json` wholesale every cycle; the
//! dashboard polls it. Readers treat a missing file as "not yet started".

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::trading_core::{LedgerSnapshot, Trade};

pub const NOT_STARTED_TEXT: &str = "Bot not started yet";
pub const STARTING_TEXT: &str = "Starting AI analysis...";
pub const ANALYZING_TEXT: &str = "Analyzing markets...";
pub const STOPPED_TEXT: &str = "Bot stopped by user";

/// Headline figures shown on the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub running: bool,
    pub balance: f64,
    /// Total realized P&L
    pub profit: f64,
    /// Closed trade count
    pub total_trades: usize,
    pub win_rate: f64,
    pub last_analysis: String,
}

/// Persisted snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotStatus {
    pub status: StatusSummary,
    #[serde(default)]
    pub trades: Vec<Trade>,
}

impl BotStatus {
    pub fn from_ledger(snapshot: LedgerSnapshot, running: bool, last_analysis: &str) -> Self {
        Self {
            status: StatusSummary {
                running,
                balance: snapshot.balance,
                profit: snapshot.total_realized_profit,
                total_trades: snapshot.total_closed_trades,
                win_rate: snapshot.win_rate,
                last_analysis: last_analysis.to_string(),
            },
            trades: snapshot.trades,
        }
    }

    /// Fresh account with no trades
    pub fn idle(running: bool, balance: f64, last_analysis: &str) -> Self {
        Self {
            status: StatusSummary {
                running,
                balance,
                profit: 0.0,
                total_trades: 0,
                win_rate: 0.0,
                last_analysis: last_analysis.to_string(),
            },
            trades: Vec::new(),
        }
    }
}

/// Location of the status file
#[derive(Debug, Clone)]
pub struct StatusFile {
    path: PathBuf,
}

impl StatusFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the file atomically (temp file + rename)
    pub fn write(&self, status: &BotStatus) -> Result<()> {
        let json = serde_json::to_string_pretty(status)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }

    /// Read the snapshot; a missing file yields the not-started view
    pub fn load(&self, initial_balance: f64) -> Result<BotStatus> {
        if !self.path.exists() {
            return Ok(BotStatus::idle(false, initial_balance, NOT_STARTED_TEXT));
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }

    /// Flag an existing snapshot as stopped. No-op if the file is absent.
    pub fn mark_stopped(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let mut status = self.load(0.0)?;
        status.status.running = false;
        status.status.last_analysis = STOPPED_TEXT.to_string();
        self.write(&status)
    }
}
