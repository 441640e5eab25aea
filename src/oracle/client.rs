//! Advisory boundary
//!
//! [`AdvisoryClient`] is the prompt-in/text-out seam to the language model.
//! [`GeminiClient`] talks to the Gemini REST API; tests use a scripted
//! advisor that replays canned replies.

use async_trait::async_trait;
use reqwest::Client;
#[cfg(test)]
use std::collections::VecDeque;
#[cfg(test)]
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

use super::models::{GenerateContentRequest, GenerateContentResponse};
use crate::config::BotConfig;

/// Default API base URL for Gemini
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, thiserror::Error)]
pub enum AdvisoryError {
    #[error("advisory request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("advisory endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("advisory reply contained no text")]
    EmptyReply,

    #[error("advisory call timed out after {0:?}")]
    Timeout(Duration),

    #[error("no API key configured (set geminiApiKey or GEMINI_API_KEY)")]
    MissingCredential,
}

/// One request/response exchange with the advisory model
#[async_trait]
pub trait AdvisoryClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, AdvisoryError>;

    /// Provider name for logs
    fn provider(&self) -> &str;
}

/// Gemini `generateContent` client
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Create a client with explicit settings
    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, AdvisoryError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        })
    }

    /// Build from the bot config, falling back to `GEMINI_API_KEY`
    pub fn from_config(config: &BotConfig, timeout: Duration) -> Result<Self, AdvisoryError> {
        let api_key = config
            .resolve_api_key()
            .ok_or(AdvisoryError::MissingCredential)?;
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self::new(api_key, config.model().to_string(), base_url, timeout)
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl AdvisoryClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, AdvisoryError> {
        debug!("Requesting analysis from {}", self.model);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&GenerateContentRequest::from_prompt(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdvisoryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: GenerateContentResponse = response.json().await?;
        reply.text().ok_or(AdvisoryError::EmptyReply)
    }

    fn provider(&self) -> &str {
        "gemini"
    }
}

/// Replays queued replies in order, then a default reply.
///
/// Records every prompt it receives.
#[cfg(test)]
pub struct ScriptedAdvisor {
    replies: Mutex<VecDeque<Result<String, String>>>,
    default_reply: String,
    prompts: Mutex<Vec<String>>,
}

#[cfg(test)]
impl ScriptedAdvisor {
    pub fn new(default_reply: &str) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            default_reply: default_reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always answer HOLD with zero confidence
    pub fn holding() -> Self {
        Self::new("ACTION: HOLD\nSYMBOL: EURUSD\nREASON: No clear setup\nCONFIDENCE: 0")
    }

    pub fn push_reply(&self, reply: &str) {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(Ok(reply.to_string()));
        }
    }

    /// Queue a failure (reported as an HTTP 503)
    pub fn push_failure(&self, message: &str) {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(Err(message.to_string()));
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
#[async_trait]
impl AdvisoryClient for ScriptedAdvisor {
    async fn generate(&self, prompt: &str) -> Result<String, AdvisoryError> {
        if let Ok(mut p) = self.prompts.lock() {
            p.push(prompt.to_string());
        }
        let next = self.replies.lock().ok().and_then(|mut q| q.pop_front());
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(body)) => Err(AdvisoryError::Status { status: 503, body }),
            None => Ok(self.default_reply.clone()),
        }
    }

    fn provider(&self) -> &str {
        "scripted"
    }
}
