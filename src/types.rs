use serde::Serialize;
use tokio::sync::Mutex;

use crate::control::Supervisor;
use crate::status::StatusFile;

/// Body of successful control responses
#[derive(Debug, Clone, Serialize)]
pub struct ControlResponse {
    pub success: bool,
    pub message: String,
}

impl ControlResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Shared application state
pub struct AppState {
    pub supervisor: Mutex<Supervisor>,
    /// Read directly so status polls never wait on a start/stop in progress
    pub status: StatusFile,
    pub initial_balance: f64,
}

impl AppState {
    pub fn new(supervisor: Supervisor, initial_balance: f64) -> Self {
        let status = supervisor.status().clone();
        Self {
            supervisor: Mutex::new(supervisor),
            status,
            initial_balance,
        }
    }
}
