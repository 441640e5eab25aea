// Library crate - simulated market, trade ledger, advisory oracle and the dashboard API

pub mod api;
pub mod config;
pub mod control;
pub mod oracle;
pub mod status;
pub mod trading_core;
pub mod types;

// Re-export commonly used types
pub use config::{BotConfig, SessionParams};
pub use control::{StartOutcome, StopOutcome, Supervisor};
pub use status::{BotStatus, StatusFile};
pub use types::AppState;
