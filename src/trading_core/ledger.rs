//! Trade Ledger - position lifecycle and P&L accounting
//!
//! Owns the account balance and every trade. Trades are opened from
//! oracle recommendations and closed either by a CLOSE recommendation or
//! by their mechanical stop-loss / take-profit.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info};

use super::market::Quotes;
use super::trades::{Side, Trade, TradeStatus};
use crate::config::{BotConfig, SessionParams};
use crate::oracle::{Action, Recommendation};

/// Trading limits and sizing constants used by the ledger
#[derive(Debug, Clone)]
pub struct LedgerLimits {
    pub max_open_trades: usize,
    pub risk_percent: f64,
    pub min_confidence: u32,
    pub lot_size: f64,
    pub notional_per_lot: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub reported_trades: usize,
    pub retained_trades: usize,
}

impl LedgerLimits {
    pub fn new(config: &BotConfig, params: &SessionParams) -> Self {
        Self {
            max_open_trades: config.max_open_trades,
            risk_percent: config.risk_percent,
            min_confidence: params.min_confidence,
            lot_size: params.lot_size,
            notional_per_lot: params.notional_per_lot,
            stop_loss_pct: params.stop_loss_pct,
            take_profit_pct: params.take_profit_pct,
            reported_trades: params.reported_trades,
            retained_trades: params.retained_trades,
        }
    }
}

impl Default for LedgerLimits {
    fn default() -> Self {
        Self::new(&BotConfig::default(), &SessionParams::default())
    }
}

/// A trade that was just closed
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub id: u64,
    pub symbol: String,
    pub side: Side,
    pub exit_price: f64,
    pub profit: f64,
}

/// What applying a recommendation did
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    NoRecommendation,
    LowConfidence(u32),
    UnknownSymbol(String),
    MaxOpenTrades,
    Held,
    Opened(Trade),
    Closed(Vec<ClosedTrade>),
}

impl ApplyOutcome {
    /// True if the ledger changed
    pub fn mutated(&self) -> bool {
        match self {
            ApplyOutcome::Opened(_) => true,
            ApplyOutcome::Closed(closed) => !closed.is_empty(),
            _ => false,
        }
    }
}

/// Read-only performance view for persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub balance: f64,
    pub total_realized_profit: f64,
    pub total_closed_trades: usize,
    /// Percent of closed trades with positive P&L
    pub win_rate: f64,
    /// Most recent trades first
    pub trades: Vec<Trade>,
}

/// Owns the account balance and trade set
#[derive(Debug)]
pub struct TradeLedger {
    limits: LedgerLimits,
    balance: f64,
    /// Every retained trade, most recent first
    trades: VecDeque<Trade>,
    last_id: u64,
    /// Closed trades dropped from the log, still counted in the stats
    evicted: EvictedTotals,
}

#[derive(Debug, Default, Clone, Copy)]
struct EvictedTotals {
    closed: usize,
    wins: usize,
    profit: f64,
}

impl TradeLedger {
    pub fn new(initial_balance: f64, limits: LedgerLimits) -> Self {
        Self {
            limits,
            balance: initial_balance,
            trades: VecDeque::new(),
            last_id: 0,
            evicted: EvictedTotals::default(),
        }
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn limits(&self) -> &LedgerLimits {
        &self.limits
    }

    /// Open trades, oldest first
    pub fn open_trades(&self) -> impl Iterator<Item = &Trade> {
        self.trades.iter().rev().filter(|t| t.is_open())
    }

    pub fn open_count(&self) -> usize {
        self.trades.iter().filter(|t| t.is_open()).count()
    }

    /// Millisecond timestamp, bumped to stay strictly increasing
    fn next_id(&mut self) -> u64 {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        self.last_id = now.max(self.last_id + 1);
        self.last_id
    }

    /// Apply an oracle recommendation against current prices
    pub fn apply<Q: Quotes + ?Sized>(
        &mut self,
        recommendation: Option<&Recommendation>,
        quotes: &Q,
    ) -> ApplyOutcome {
        let Some(rec) = recommendation else {
            return ApplyOutcome::NoRecommendation;
        };

        if rec.confidence <= self.limits.min_confidence {
            debug!(
                "Ignoring {} {}: confidence {} <= {}",
                rec.action, rec.symbol, rec.confidence, self.limits.min_confidence
            );
            return ApplyOutcome::LowConfidence(rec.confidence);
        }

        let Some(price) = quotes.quote(&rec.symbol) else {
            debug!("Ignoring {} for unknown symbol {}", rec.action, rec.symbol);
            return ApplyOutcome::UnknownSymbol(rec.symbol.clone());
        };

        match rec.action {
            Action::Buy => self.open(&rec.symbol, Side::Buy, price, &rec.reason),
            Action::Sell => self.open(&rec.symbol, Side::Sell, price, &rec.reason),
            Action::Close => ApplyOutcome::Closed(self.close_symbol(&rec.symbol, price, &rec.reason)),
            Action::Hold => ApplyOutcome::Held,
        }
    }

    fn open(&mut self, symbol: &str, side: Side, price: f64, reason: &str) -> ApplyOutcome {
        if self.open_count() >= self.limits.max_open_trades {
            info!(
                "Max open trades ({}) reached, skipping {} {}",
                self.limits.max_open_trades, side, symbol
            );
            return ApplyOutcome::MaxOpenTrades;
        }

        // Lot size stays fixed; the risk budget is informational only
        let risk_amount = self.balance * self.limits.risk_percent / 100.0;
        debug!("Risk budget for {} {}: ${:.2}", side, symbol, risk_amount);

        let (stop_loss, take_profit) =
            side.bracket(price, self.limits.stop_loss_pct, self.limits.take_profit_pct);

        let trade = Trade {
            id: self.next_id(),
            symbol: symbol.to_string(),
            side,
            entry_price: price,
            stop_loss,
            take_profit,
            lot_size: self.limits.lot_size,
            opened_at: Utc::now(),
            status: TradeStatus::Open,
            exit_price: None,
            realized_profit: None,
            reason: reason.to_string(),
        };

        info!(
            "OPENED {}: {} @ {:.5} | Stop: {:.5} | Target: {:.5}",
            side, symbol, price, stop_loss, take_profit
        );

        self.trades.push_front(trade.clone());
        self.evict_old_trades();
        ApplyOutcome::Opened(trade)
    }

    /// Close every open trade on `symbol` at `price`, tagging it with `reason`
    fn close_symbol(&mut self, symbol: &str, price: f64, reason: &str) -> Vec<ClosedTrade> {
        let notional = self.limits.notional_per_lot;
        let mut closed = Vec::new();

        for trade in self
            .trades
            .iter_mut()
            .rev()
            .filter(|t| t.is_open() && t.symbol == symbol)
        {
            let profit = trade.close(price, notional);
            trade.reason = reason.to_string();
            closed.push(Self::closed_record(trade, profit));
        }

        for c in &closed {
            self.record_close(c);
        }
        closed
    }

    /// Close open trades whose stop or target has been reached
    pub fn manage_open_trades<Q: Quotes + ?Sized>(&mut self, quotes: &Q) -> Vec<ClosedTrade> {
        let notional = self.limits.notional_per_lot;
        let mut closed = Vec::new();

        for trade in self.trades.iter_mut().rev().filter(|t| t.is_open()) {
            let Some(price) = quotes.quote(&trade.symbol) else {
                continue;
            };
            if trade.exit_triggered(price) {
                let profit = trade.close(price, notional);
                closed.push(Self::closed_record(trade, profit));
            }
        }

        for c in &closed {
            self.record_close(c);
        }
        closed
    }

    fn closed_record(trade: &Trade, profit: f64) -> ClosedTrade {
        ClosedTrade {
            id: trade.id,
            symbol: trade.symbol.clone(),
            side: trade.side,
            exit_price: trade.exit_price.unwrap_or_default(),
            profit,
        }
    }

    fn record_close(&mut self, closed: &ClosedTrade) {
        self.balance += closed.profit;
        info!(
            "CLOSED {}: {} @ {:.5} | P/L: ${:.2}",
            closed.side, closed.symbol, closed.exit_price, closed.profit
        );
    }

    /// Drop the oldest closed trades beyond the retention limit
    fn evict_old_trades(&mut self) {
        while self.trades.len() > self.limits.retained_trades {
            match self.trades.iter().rposition(|t| !t.is_open()) {
                Some(idx) => {
                    if let Some(trade) = self.trades.remove(idx) {
                        let profit = trade.realized_profit.unwrap_or(0.0);
                        self.evicted.closed += 1;
                        self.evicted.wins += usize::from(profit > 0.0);
                        self.evicted.profit += profit;
                    }
                }
                None => break,
            }
        }
    }

    /// Performance figures over every closed trade, evicted ones included
    pub fn snapshot(&self) -> LedgerSnapshot {
        let closed: Vec<f64> = self
            .trades
            .iter()
            .filter(|t| t.status == TradeStatus::Closed)
            .map(|t| t.realized_profit.unwrap_or(0.0))
            .collect();

        let total_closed = closed.len() + self.evicted.closed;
        let wins = closed.iter().filter(|p| **p > 0.0).count() + self.evicted.wins;
        let win_rate = if total_closed == 0 {
            0.0
        } else {
            wins as f64 / total_closed as f64 * 100.0
        };

        LedgerSnapshot {
            balance: self.balance,
            total_realized_profit: self.evicted.profit + closed.iter().sum::<f64>(),
            total_closed_trades: total_closed,
            win_rate,
            trades: self
                .trades
                .iter()
                .take(self.limits.reported_trades)
                .cloned()
                .collect(),
        }
    }

    /// One-line summary for logs
    pub fn stats_summary(&self) -> String {
        let snap = self.snapshot();
        format!(
            "Balance: ${:.2} | P/L: ${:.2} | Closed: {} | WR: {:.1}% | Open: {}",
            snap.balance,
            snap.total_realized_profit,
            snap.total_closed_trades,
            snap.win_rate,
            self.open_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::HashMap;

    fn quotes(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(s, p)| (s.to_string(), *p)).collect()
    }

    fn rec(action: Action, symbol: &str, confidence: u32) -> Recommendation {
        Recommendation {
            action,
            symbol: symbol.to_string(),
            reason: format!("{} {}", action, symbol),
            confidence,
            raw_text: String::new(),
        }
    }

    fn ledger(max_open: usize) -> TradeLedger {
        TradeLedger::new(
            10_000.0,
            LedgerLimits {
                max_open_trades: max_open,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_none_and_low_confidence_are_noops() {
        let mut l = ledger(3);
        let q = quotes(&[("EURUSD", 1.1)]);

        assert_eq!(l.apply(None, &q), ApplyOutcome::NoRecommendation);
        for confidence in [0, 50, 69, 70] {
            let outcome = l.apply(Some(&rec(Action::Buy, "EURUSD", confidence)), &q);
            assert_eq!(outcome, ApplyOutcome::LowConfidence(confidence));
            assert!(!outcome.mutated());
        }
        assert_eq!(l.open_count(), 0);
        assert_eq!(l.balance(), 10_000.0);
    }

    #[test]
    fn test_open_buy_sets_bracket() {
        let mut l = ledger(3);
        let q = quotes(&[("EURUSD", 1.10000)]);

        let ApplyOutcome::Opened(trade) = l.apply(Some(&rec(Action::Buy, "EURUSD", 80)), &q) else {
            panic!("expected open");
        };
        assert_relative_eq!(trade.stop_loss, 1.09450, epsilon = 1e-9);
        assert_relative_eq!(trade.take_profit, 1.11650, epsilon = 1e-9);
        assert_eq!(trade.lot_size, 0.01);
        assert_eq!(trade.status, TradeStatus::Open);
        assert_eq!(l.open_count(), 1);
        // opening does not touch the balance
        assert_eq!(l.balance(), 10_000.0);
    }

    #[test]
    fn test_take_profit_closes_buy() {
        let mut l = ledger(3);
        l.apply(Some(&rec(Action::Buy, "EURUSD", 80)), &quotes(&[("EURUSD", 1.10000)]));

        // not yet at target
        assert!(l.manage_open_trades(&quotes(&[("EURUSD", 1.11000)])).is_empty());

        let target = l.open_trades().next().unwrap().take_profit;
        let closed = l.manage_open_trades(&quotes(&[("EURUSD", target)]));
        assert_eq!(closed.len(), 1);
        assert_relative_eq!(closed[0].profit, 16.5, epsilon = 1e-6);
        assert_relative_eq!(l.balance(), 10_016.5, epsilon = 1e-6);
        assert_eq!(l.open_count(), 0);

        let snap = l.snapshot();
        assert_eq!(snap.trades[0].status, TradeStatus::Closed);
        assert_eq!(snap.trades[0].exit_price, Some(target));
    }

    #[test]
    fn test_stop_loss_closes_sell() {
        let mut l = ledger(3);
        l.apply(Some(&rec(Action::Sell, "GBPUSD", 90)), &quotes(&[("GBPUSD", 1.20000)]));

        let closed = l.manage_open_trades(&quotes(&[("GBPUSD", 1.20700)]));
        assert_eq!(closed.len(), 1);
        assert!(closed[0].profit < 0.0);
        assert_relative_eq!(closed[0].profit, -7.0, epsilon = 1e-6);
    }

    #[test]
    fn test_max_open_trades_is_noop() {
        let mut l = ledger(2);
        let q = quotes(&[("EURUSD", 1.1), ("GBPUSD", 1.2), ("AUDUSD", 0.6)]);

        l.apply(Some(&rec(Action::Buy, "EURUSD", 80)), &q);
        l.apply(Some(&rec(Action::Sell, "GBPUSD", 80)), &q);
        let outcome = l.apply(Some(&rec(Action::Buy, "AUDUSD", 95)), &q);

        assert_eq!(outcome, ApplyOutcome::MaxOpenTrades);
        assert_eq!(l.open_count(), 2);
        assert_eq!(l.snapshot().trades.len(), 2);
    }

    #[test]
    fn test_close_only_touches_symbol() {
        let mut l = ledger(5);
        let q = quotes(&[("EURUSD", 1.1), ("GBPUSD", 1.2)]);
        l.apply(Some(&rec(Action::Buy, "EURUSD", 80)), &q);
        l.apply(Some(&rec(Action::Sell, "EURUSD", 80)), &q);
        l.apply(Some(&rec(Action::Buy, "GBPUSD", 80)), &q);

        let later = quotes(&[("EURUSD", 1.101), ("GBPUSD", 1.25)]);
        let mut close = rec(Action::Close, "EURUSD", 85);
        close.reason = "trend exhausted".to_string();
        let ApplyOutcome::Closed(closed) = l.apply(Some(&close), &later) else {
            panic!("expected close");
        };

        assert_eq!(closed.len(), 2);
        assert!(closed.iter().all(|c| c.symbol == "EURUSD" && c.exit_price == 1.101));
        // BUY +1.0, SELL -1.0
        assert_relative_eq!(l.balance(), 10_000.0, epsilon = 1e-6);

        let open: Vec<_> = l.open_trades().collect();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].symbol, "GBPUSD");

        let snap = l.snapshot();
        assert!(snap
            .trades
            .iter()
            .filter(|t| t.symbol == "EURUSD")
            .all(|t| t.reason == "trend exhausted" && t.status == TradeStatus::Closed));
    }

    #[test]
    fn test_close_without_open_trades() {
        let mut l = ledger(3);
        let outcome = l.apply(Some(&rec(Action::Close, "EURUSD", 90)), &quotes(&[("EURUSD", 1.1)]));
        assert_eq!(outcome, ApplyOutcome::Closed(vec![]));
        assert!(!outcome.mutated());
    }

    #[test]
    fn test_unknown_symbol_and_hold() {
        let mut l = ledger(3);
        let q = quotes(&[("EURUSD", 1.1)]);
        assert_eq!(
            l.apply(Some(&rec(Action::Buy, "XAUUSD", 90)), &q),
            ApplyOutcome::UnknownSymbol("XAUUSD".to_string())
        );
        assert_eq!(l.apply(Some(&rec(Action::Hold, "EURUSD", 90)), &q), ApplyOutcome::Held);
        assert_eq!(l.open_count(), 0);
    }

    #[test]
    fn test_win_rate_and_total_profit() {
        let mut l = ledger(3);
        let entry = quotes(&[("A", 1.0), ("B", 1.0), ("C", 1.0)]);
        for s in ["A", "B", "C"] {
            l.apply(Some(&rec(Action::Buy, s, 80)), &entry);
        }

        // +10, -5, +2 with 0.01 lots of 100k
        let exits = quotes(&[("A", 1.010), ("B", 0.995), ("C", 1.002)]);
        for s in ["A", "B", "C"] {
            l.apply(Some(&rec(Action::Close, s, 80)), &exits);
        }

        let snap = l.snapshot();
        assert_eq!(snap.total_closed_trades, 3);
        assert_relative_eq!(snap.total_realized_profit, 7.0, epsilon = 1e-6);
        assert_relative_eq!(snap.win_rate, 200.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(snap.balance, 10_007.0, epsilon = 1e-6);
    }

    #[test]
    fn test_fresh_snapshot() {
        let l = ledger(3);
        let snap = l.snapshot();
        assert_eq!(snap.balance, 10_000.0);
        assert_eq!(snap.total_realized_profit, 0.0);
        assert_eq!(snap.total_closed_trades, 0);
        assert_eq!(snap.win_rate, 0.0);
        assert!(snap.trades.is_empty());
    }

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let mut l = ledger(10);
        let q = quotes(&[("EURUSD", 1.1)]);
        let ids: Vec<u64> = (0..5)
            .filter_map(|_| match l.apply(Some(&rec(Action::Buy, "EURUSD", 80)), &q) {
                ApplyOutcome::Opened(t) => Some(t.id),
                _ => None,
            })
            .collect();
        assert_eq!(ids.len(), 5);
        assert!(ids.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_report_is_capped_most_recent_first() {
        let mut l = ledger(1);
        let q = quotes(&[("EURUSD", 1.1)]);
        let mut last_id = 0;
        for _ in 0..25 {
            if let ApplyOutcome::Opened(t) = l.apply(Some(&rec(Action::Buy, "EURUSD", 80)), &q) {
                last_id = t.id;
            }
            l.apply(Some(&rec(Action::Close, "EURUSD", 80)), &q);
        }

        let snap = l.snapshot();
        assert_eq!(snap.trades.len(), 20);
        assert_eq!(snap.trades[0].id, last_id);
        assert_eq!(snap.total_closed_trades, 25);
    }

    #[test]
    fn test_retention_evicts_closed_trades_only() {
        let mut l = TradeLedger::new(
            10_000.0,
            LedgerLimits {
                max_open_trades: 3,
                retained_trades: 3,
                ..Default::default()
            },
        );
        let q = quotes(&[("EURUSD", 1.1), ("GBPUSD", 1.2)]);
        l.apply(Some(&rec(Action::Buy, "GBPUSD", 80)), &q);
        for _ in 0..5 {
            l.apply(Some(&rec(Action::Buy, "EURUSD", 80)), &q);
            l.apply(Some(&rec(Action::Close, "EURUSD", 80)), &q);
        }

        let snap = l.snapshot();
        assert_eq!(snap.trades.len(), 3);
        assert_eq!(l.open_count(), 1);
        assert_eq!(l.open_trades().next().unwrap().symbol, "GBPUSD");
    }

    #[test]
    fn test_stats_survive_eviction() {
        let mut l = TradeLedger::new(
            10_000.0,
            LedgerLimits {
                retained_trades: 3,
                ..Default::default()
            },
        );
        let entry = quotes(&[("EURUSD", 1.100)]);
        let exit = quotes(&[("EURUSD", 1.101)]);
        let loss = quotes(&[("EURUSD", 1.099)]);

        // four winners at +1.0, then one loser at -1.0
        for i in 0..5 {
            l.apply(Some(&rec(Action::Buy, "EURUSD", 80)), &entry);
            let close_at = if i == 4 { &loss } else { &exit };
            l.apply(Some(&rec(Action::Close, "EURUSD", 80)), close_at);
        }
        // one more open pushes the log past the cap again
        l.apply(Some(&rec(Action::Buy, "EURUSD", 80)), &entry);

        let snap = l.snapshot();
        assert_eq!(snap.trades.len(), 3);
        assert_eq!(snap.total_closed_trades, 5);
        assert_relative_eq!(snap.total_realized_profit, 3.0, epsilon = 1e-6);
        assert_relative_eq!(snap.total_realized_profit, snap.balance - 10_000.0, epsilon = 1e-6);
        assert_relative_eq!(snap.win_rate, 80.0, epsilon = 1e-9);
    }
}
