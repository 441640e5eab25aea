//! Startup configuration
//!
//! [`BotConfig`] is the account/risk file written by the dashboard's start
//! endpoint. [`SessionParams`] holds the fixed simulation and trading
//! constants, overridable from code and tests.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable consulted when the config carries no API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Default Gemini model
pub const DEFAULT_MODEL: &str = "gemini-pro";

/// Account/risk parameters and advisory credentials (`bot-config.json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotConfig {
    /// Percent of balance risked per trade
    #[serde(default = "default_risk_percent")]
    pub risk_percent: f64,

    /// Maximum concurrently open trades
    #[serde(default = "default_max_open_trades")]
    pub max_open_trades: usize,

    /// Gemini API key; falls back to `GEMINI_API_KEY`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,

    /// Model name (e.g. "gemini-pro")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Override for the advisory endpoint base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

fn default_risk_percent() -> f64 {
    1.0
}

fn default_max_open_trades() -> usize {
    3
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            risk_percent: default_risk_percent(),
            max_open_trades: default_max_open_trades(),
            gemini_api_key: None,
            model: None,
            base_url: None,
        }
    }
}

impl BotConfig {
    /// Load from a JSON file. A missing file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Configuration file not found: {}", path.display()))?;
        let config: BotConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Persist as JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write configuration to {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_open_trades == 0 {
            bail!("maxOpenTrades must be at least 1");
        }
        if !(self.risk_percent > 0.0 && self.risk_percent <= 100.0) {
            bail!("riskPercent must be in (0, 100], got {}", self.risk_percent);
        }
        Ok(())
    }

    /// API key from the config, else from the environment.
    ///
    /// Blank values count as missing.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.gemini_api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Fixed constants of a trading session
#[derive(Debug, Clone)]
pub struct SessionParams {
    /// Instruments and their base prices
    pub instruments: Vec<(String, f64)>,
    /// Starting account balance
    pub initial_balance: f64,
    /// Full width of the uniform per-step price change
    pub volatility: f64,
    /// Max price history per instrument
    pub history_capacity: usize,
    /// Delay between cycles
    pub cycle_interval: Duration,
    /// Consult the oracle every Nth cycle
    pub analysis_every: u64,
    /// Recommendations must be strictly above this confidence
    pub min_confidence: u32,
    /// Fixed lot size per trade
    pub lot_size: f64,
    /// Currency units per lot
    pub notional_per_lot: f64,
    /// Stop distance as a fraction of entry (0.005 = 0.5%)
    pub stop_loss_pct: f64,
    /// Target distance as a fraction of entry (0.015 = 1.5%)
    pub take_profit_pct: f64,
    /// Upper bound on one advisory call
    pub advisory_timeout: Duration,
    /// Trades included in the snapshot
    pub reported_trades: usize,
    /// Trades retained for performance accounting
    pub retained_trades: usize,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            instruments: vec![
                ("EURUSD".to_string(), 1.0850),
                ("GBPUSD".to_string(), 1.2650),
                ("USDJPY".to_string(), 149.50),
                ("AUDUSD".to_string(), 0.6450),
                ("USDCAD".to_string(), 1.3650),
                ("NZDUSD".to_string(), 0.5950),
            ],
            initial_balance: 10_000.0,
            volatility: 0.0003,
            history_capacity: 100,
            cycle_interval: Duration::from_secs(10),
            analysis_every: 3,
            min_confidence: 70,
            lot_size: 0.01,
            notional_per_lot: 100_000.0,
            stop_loss_pct: 0.005,
            take_profit_pct: 0.015,
            advisory_timeout: Duration::from_secs(30),
            reported_trades: 20,
            retained_trades: 1000,
        }
    }
}

impl SessionParams {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.cycle_interval = interval;
        self
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.instruments.iter().map(|(s, _)| s.as_str())
    }
}
