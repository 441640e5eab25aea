use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::config::BotConfig;
use crate::control::{StartOutcome, StopOutcome};
use crate::types::{AppState, ControlResponse};

fn error_response(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(serde_json::json!({"error": message.into()})))
}

/// Dashboard API routes
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/bot-status", get(get_bot_status))
        .route("/api/start-bot", post(start_bot))
        .route("/api/stop-bot", post(stop_bot))
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .with_state(state)
}

/// GET /api/bot-status - Latest snapshot
pub async fn get_bot_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.status.load(state.initial_balance) {
        Ok(status) => (StatusCode::OK, Json(serde_json::json!(status))),
        Err(e) => {
            error!("Failed to read bot status: {:#}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read bot status")
        }
    }
}

/// POST /api/start-bot - Persist config and start the loop
pub async fn start_bot(
    State(state): State<Arc<AppState>>,
    body: Result<Json<BotConfig>, JsonRejection>,
) -> impl IntoResponse {
    let config = match body {
        Ok(Json(config)) => config,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.body_text()),
    };
    if let Err(e) = config.validate() {
        return error_response(StatusCode::BAD_REQUEST, e.to_string());
    }

    let mut supervisor = state.supervisor.lock().await;
    match supervisor.start(config) {
        Ok(StartOutcome::Started) => (
            StatusCode::OK,
            Json(serde_json::json!(ControlResponse::ok("Bot started successfully"))),
        ),
        Ok(StartOutcome::AlreadyRunning) => {
            error_response(StatusCode::BAD_REQUEST, "Bot is already running")
        }
        Err(e) => {
            error!("Failed to start bot: {:#}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to start bot: {:#}", e),
            )
        }
    }
}

/// POST /api/stop-bot - Stop the loop and mark the snapshot stopped
pub async fn stop_bot(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut supervisor = state.supervisor.lock().await;
    match supervisor.stop().await {
        Ok(StopOutcome::NotRunning) => {
            info!("Stop requested but bot is not running");
            (
                StatusCode::OK,
                Json(serde_json::json!(ControlResponse::ok("Bot is not running"))),
            )
        }
        Ok(_) => (
            StatusCode::OK,
            Json(serde_json::json!(ControlResponse::ok("Bot stopped successfully"))),
        ),
        Err(e) => {
            error!("Failed to stop bot: {:#}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to stop bot")
        }
    }
}
