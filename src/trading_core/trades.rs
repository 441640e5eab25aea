//! Trade types for trading core

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Stop-loss and take-profit prices for a position opened at `entry`.
    ///
    /// `stop_pct` and `target_pct` are fractions (0.005 = 0.5%).
    pub fn bracket(self, entry: f64, stop_pct: f64, target_pct: f64) -> (f64, f64) {
        match self {
            Side::Buy => (entry * (1.0 - stop_pct), entry * (1.0 + target_pct)),
            Side::Sell => (entry * (1.0 + stop_pct), entry * (1.0 - target_pct)),
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    Open,
    Closed,
}

/// Simulated position. Serialized in the dashboard's snapshot format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: u64,
    pub symbol: String,
    #[serde(rename = "type")]
    pub side: Side,
    #[serde(rename = "entry")]
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub lot_size: f64,
    #[serde(rename = "timestamp")]
    pub opened_at: DateTime<Utc>,
    pub status: TradeStatus,
    #[serde(rename = "exit", default, skip_serializing_if = "Option::is_none")]
    pub exit_price: Option<f64>,
    #[serde(rename = "profit", default, skip_serializing_if = "Option::is_none")]
    pub realized_profit: Option<f64>,
    pub reason: String,
}

impl Trade {
    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    /// True when `price` has reached the stop or the target
    pub fn exit_triggered(&self, price: f64) -> bool {
        match self.side {
            Side::Buy => price >= self.take_profit || price <= self.stop_loss,
            Side::Sell => price <= self.take_profit || price >= self.stop_loss,
        }
    }

    /// P&L in account currency if the position were closed at `price`
    pub fn profit_at(&self, price: f64, notional_per_lot: f64) -> f64 {
        let diff = match self.side {
            Side::Buy => price - self.entry_price,
            Side::Sell => self.entry_price - price,
        };
        diff * notional_per_lot * self.lot_size
    }

    /// Close the trade in place and return the realized P&L.
    pub fn close(&mut self, price: f64, notional_per_lot: f64) -> f64 {
        let profit = self.profit_at(price, notional_per_lot);
        self.exit_price = Some(price);
        self.realized_profit = Some(profit);
        self.status = TradeStatus::Closed;
        profit
    }
}
