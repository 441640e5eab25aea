//! Cycle Controller
//!
//! A [`TradingSession`] is the per-run context: it owns the market, the
//! ledger and the oracle, and drives them on a fixed interval. One cycle:
//!
//! 1. advance market prices
//! 2. close trades whose stop/target was hit
//! 3. every Nth cycle, consult the oracle and apply its recommendation
//! 4. write the status snapshot
//!
//! The stop signal is only honoured between cycles.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use super::ledger::{ApplyOutcome, ClosedTrade, LedgerLimits, TradeLedger};
use super::market::MarketSimulator;
use crate::config::{BotConfig, SessionParams};
use crate::oracle::{AdvisoryClient, Consultation, DecisionOracle, PromptContext};
use crate::status::{BotStatus, StatusFile, ANALYZING_TEXT, STARTING_TEXT};

/// What happened during one cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle: u64,
    pub closed: Vec<ClosedTrade>,
    pub consultation: Option<Consultation>,
    pub outcome: Option<ApplyOutcome>,
}

pub struct TradingSession {
    params: SessionParams,
    market: MarketSimulator,
    ledger: TradeLedger,
    oracle: DecisionOracle,
    status: StatusFile,
    cycle: u64,
    last_analysis: String,
}

impl TradingSession {
    pub fn new(
        config: &BotConfig,
        params: SessionParams,
        advisor: Arc<dyn AdvisoryClient>,
        status: StatusFile,
    ) -> Self {
        let mut market = MarketSimulator::new(params.volatility, params.history_capacity);
        market.initialize(&params.instruments);

        Self::with_market(config, params, advisor, status, market)
    }

    /// Session over a pre-built (e.g. seeded) market
    pub fn with_market(
        config: &BotConfig,
        params: SessionParams,
        advisor: Arc<dyn AdvisoryClient>,
        status: StatusFile,
        market: MarketSimulator,
    ) -> Self {
        let ledger = TradeLedger::new(params.initial_balance, LedgerLimits::new(config, &params));
        let oracle = DecisionOracle::new(advisor, params.advisory_timeout);

        Self {
            params,
            market,
            ledger,
            oracle,
            status,
            cycle: 0,
            last_analysis: STARTING_TEXT.to_string(),
        }
    }

    pub fn market(&self) -> &MarketSimulator {
        &self.market
    }

    pub fn ledger(&self) -> &TradeLedger {
        &self.ledger
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Current snapshot as persisted
    pub fn snapshot(&self, running: bool) -> BotStatus {
        BotStatus::from_ledger(self.ledger.snapshot(), running, &self.last_analysis)
    }

    fn publish(&self, running: bool) {
        if let Err(e) = self.status.write(&self.snapshot(running)) {
            warn!("Failed to save status: {:#}", e);
        }
    }

    fn prompt_context(&self) -> PromptContext {
        let limits = self.ledger.limits();
        PromptContext {
            balance: self.ledger.balance(),
            open_trades: self.ledger.open_count(),
            max_open_trades: limits.max_open_trades,
            risk_percent: limits.risk_percent,
        }
    }

    /// Run a single cycle
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.cycle += 1;

        self.market.advance_cycle();
        let closed = self.ledger.manage_open_trades(&self.market);

        let mut consultation = None;
        let mut outcome = None;

        if self.params.analysis_every > 0 && self.cycle % self.params.analysis_every == 0 {
            let ctx = self.prompt_context();
            let result = self.oracle.consult(self.market.instruments(), &ctx).await;

            if let Some(rec) = result.recommendation() {
                outcome = Some(self.ledger.apply(Some(rec), &self.market));
            }
            self.last_analysis = result.analysis_text();
            consultation = Some(result);
        } else {
            self.last_analysis = ANALYZING_TEXT.to_string();
        }

        self.publish(true);

        CycleReport {
            cycle: self.cycle,
            closed,
            consultation,
            outcome,
        }
    }

    /// Run cycles until `stop` turns true or its sender is dropped
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> TradeLedger {
        info!("AI Forex Trading Bot Started");
        info!("Initial Balance: ${:.2}", self.ledger.balance());
        self.publish(true);

        loop {
            if *stop.borrow_and_update() {
                break;
            }

            self.run_cycle().await;

            tokio::select! {
                _ = tokio::time::sleep(self.params.cycle_interval) => {}
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Trading stopped after {} cycles | {}", self.cycle, self.ledger.stats_summary());
        self.ledger
    }
}
