//! Decision Oracle
//!
//! Turns market and account state into a prompt, asks the advisory model,
//! and decodes its reply.
//!
//! # Components
//!
//! - [`prompt`] - guidance request formatting
//! - [`client`] - advisory boundary trait and Gemini HTTP client
//! - [`models`] - Gemini request/response types
//! - [`parser`] - reply decoding into a [`Recommendation`]

pub mod client;
pub mod models;
pub mod parser;
pub mod prompt;

pub use client::{AdvisoryClient, AdvisoryError, GeminiClient};
#[cfg(test)]
pub use client::ScriptedAdvisor;
pub use parser::{parse_reply, Action, ParsedReply, Recommendation};
pub use prompt::{build_prompt, PromptContext};

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::trading_core::Instrument;

/// Outcome of one consultation
#[derive(Debug, Clone, PartialEq)]
pub enum Consultation {
    /// Reply decoded into a recommendation
    Advice(Recommendation),
    /// Reply received but missing ACTION or SYMBOL
    Unparseable { raw_text: String },
    /// Advisory call failed or timed out
    Unavailable { error: String },
}

impl Consultation {
    pub fn recommendation(&self) -> Option<&Recommendation> {
        match self {
            Consultation::Advice(rec) => Some(rec),
            _ => None,
        }
    }

    /// Text shown as the dashboard's last analysis
    pub fn analysis_text(&self) -> String {
        match self {
            Consultation::Advice(rec) => rec.raw_text.clone(),
            Consultation::Unparseable { raw_text } => raw_text.clone(),
            Consultation::Unavailable { error } => format!("AI analysis unavailable: {}", error),
        }
    }
}

/// Consults the advisory model once per call
pub struct DecisionOracle {
    client: Arc<dyn AdvisoryClient>,
    timeout: Duration,
}

impl DecisionOracle {
    pub fn new(client: Arc<dyn AdvisoryClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Ask for one recommendation. Never fails; problems become
    /// [`Consultation::Unparseable`] or [`Consultation::Unavailable`].
    pub async fn consult(&self, instruments: &[Instrument], ctx: &PromptContext) -> Consultation {
        let prompt = build_prompt(instruments, ctx);

        let reply = match tokio::time::timeout(self.timeout, self.client.generate(&prompt)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!("AI analysis error ({}): {}", self.client.provider(), e);
                return Consultation::Unavailable {
                    error: e.to_string(),
                };
            }
            Err(_) => {
                let e = AdvisoryError::Timeout(self.timeout);
                warn!("AI analysis error ({}): {}", self.client.provider(), e);
                return Consultation::Unavailable {
                    error: e.to_string(),
                };
            }
        };

        match parse_reply(&reply) {
            ParsedReply::Recommendation(rec) => {
                info!(
                    "AI Decision: {} {} | Confidence: {}% | Reason: {}",
                    rec.action, rec.symbol, rec.confidence, rec.reason
                );
                Consultation::Advice(rec)
            }
            ParsedReply::Unparseable { raw_text } => {
                warn!("Could not parse AI reply: {:?}", raw_text);
                Consultation::Unparseable { raw_text }
            }
        }
    }
}
