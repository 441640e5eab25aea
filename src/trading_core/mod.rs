//! Trading Core - market simulation, indicators, trade ledger and the cycle loop
//!
//! - [`market`] - random-walk price simulator with per-instrument history
//! - [`indicators`] - SMA20, Bollinger bands, RSI, momentum
//! - [`trades`] - trade records and stop/target arithmetic
//! - [`ledger`] - open/close bookkeeping and performance stats
//! - [`session`] - fixed-interval cycle controller

pub mod indicators;
pub mod ledger;
pub mod market;
pub mod session;
pub mod trades;

// Re-export commonly used types
pub use indicators::IndicatorSnapshot;
pub use ledger::{ApplyOutcome, ClosedTrade, LedgerLimits, LedgerSnapshot, TradeLedger};
pub use market::{Instrument, MarketSimulator, Quotes};
pub use session::{CycleReport, TradingSession};
pub use trades::{Side, Trade, TradeStatus};
