//! Bot lifecycle control
//!
//! The [`Supervisor`] owns at most one running [`TradingSession`] task and
//! the stop channel that ends it.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::{BotConfig, SessionParams};
use crate::oracle::{AdvisoryClient, AdvisoryError, GeminiClient};
use crate::status::{BotStatus, StatusFile, STARTING_TEXT};
use crate::trading_core::{TradeLedger, TradingSession};

/// Builds the advisory client for a start request
pub type AdvisorFactory =
    Arc<dyn Fn(&BotConfig) -> Result<Arc<dyn AdvisoryClient>, AdvisoryError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Loop exited between cycles
    Stopped,
    /// Grace period elapsed and the task was aborted
    Aborted,
    NotRunning,
}

struct RunningSession {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<TradeLedger>,
}

pub struct Supervisor {
    params: SessionParams,
    config_path: PathBuf,
    status: StatusFile,
    advisor_factory: AdvisorFactory,
    grace_period: Duration,
    session: Option<RunningSession>,
}

impl Supervisor {
    pub fn new(
        params: SessionParams,
        config_path: impl Into<PathBuf>,
        status: StatusFile,
        advisor_factory: AdvisorFactory,
    ) -> Self {
        // long enough for one in-flight advisory call to finish
        let grace_period = params.advisory_timeout + Duration::from_secs(5);
        Self {
            params,
            config_path: config_path.into(),
            status,
            advisor_factory,
            grace_period,
            session: None,
        }
    }

    /// Supervisor whose sessions talk to Gemini
    pub fn with_gemini(
        params: SessionParams,
        config_path: impl Into<PathBuf>,
        status: StatusFile,
    ) -> Self {
        let timeout = params.advisory_timeout;
        let factory: AdvisorFactory = Arc::new(move |config: &BotConfig| {
            let client = GeminiClient::from_config(config, timeout)?;
            Ok(Arc::new(client) as Arc<dyn AdvisoryClient>)
        });
        Self::new(params, config_path, status, factory)
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn status(&self) -> &StatusFile {
        &self.status
    }

    /// Mark a snapshot left by an earlier process as stopped.
    ///
    /// Failures are logged and otherwise ignored.
    pub fn reset_stale_status(&self) {
        if self.is_running() {
            return;
        }
        if let Err(e) = self.status.mark_stopped() {
            warn!("Could not reset stale status file: {:#}", e);
        }
    }

    pub fn is_running(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| !s.handle.is_finished())
    }

    /// Persist `config`, write the starting snapshot and spawn the loop
    pub fn start(&mut self, config: BotConfig) -> Result<StartOutcome> {
        if self.is_running() {
            return Ok(StartOutcome::AlreadyRunning);
        }

        config.validate()?;
        let advisor = (self.advisor_factory)(&config).context("Cannot start trading bot")?;

        config.save(&self.config_path)?;
        self.status.write(&BotStatus::idle(
            true,
            self.params.initial_balance,
            STARTING_TEXT,
        ))?;

        let session = TradingSession::new(&config, self.params.clone(), advisor, self.status.clone());
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(session.run(stop_rx));

        info!(
            "Trading bot started (maxOpenTrades={}, riskPercent={}%)",
            config.max_open_trades, config.risk_percent
        );
        self.session = Some(RunningSession { stop_tx, handle });
        Ok(StartOutcome::Started)
    }

    /// Signal the loop to stop and wait for it, aborting after the grace period
    pub async fn stop(&mut self) -> Result<StopOutcome> {
        let Some(RunningSession { stop_tx, mut handle }) = self.session.take() else {
            return Ok(StopOutcome::NotRunning);
        };

        if handle.is_finished() {
            warn!("Trading task had already exited");
        }
        let _ = stop_tx.send(true);

        let outcome = match tokio::time::timeout(self.grace_period, &mut handle).await {
            Ok(Ok(ledger)) => {
                info!("Trading bot stopped | {}", ledger.stats_summary());
                StopOutcome::Stopped
            }
            Ok(Err(e)) => {
                warn!("Trading task ended abnormally: {}", e);
                StopOutcome::Stopped
            }
            Err(_) => {
                warn!(
                    "Trading task did not stop within {:?}, aborting",
                    self.grace_period
                );
                handle.abort();
                // wait for the cancellation so no cycle writes after mark_stopped
                let _ = handle.await;
                StopOutcome::Aborted
            }
        };

        self.status.mark_stopped()?;
        Ok(outcome)
    }
}
