//! Outbound webhook relay.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing;

use statuswatch_core::error::{AppError, ErrorKind};
use statuswatch_core::result::AppResult;

/// Maximum number of response body bytes quoted in a failure message.
const MAX_ERROR_BODY: usize = 300;

/// Mention parsing rules attached to a webhook message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedMentions {
    /// Mention kinds that may ping (`"users"`, `"roles"`, `"everyone"`).
    pub parse: Vec<String>,
}

impl AllowedMentions {
    /// Only user mentions ping.
    pub fn users() -> Self {
        Self {
            parse: vec!["users".to_string()],
        }
    }
}

/// JSON body of a webhook post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// Message text.
    pub content: String,
    /// Mention rules.
    pub allowed_mentions: AllowedMentions,
}

impl WebhookPayload {
    /// A message whose user mentions ping.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            allowed_mentions: AllowedMentions::users(),
        }
    }
}

/// HTTP client posting JSON messages to a single webhook URL.
///
/// Any 2xx response is success; any other status or a network error is a
/// `Delivery` error. Nothing is retried.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    /// Shared HTTP client carrying the request timeout.
    client: reqwest::Client,
    /// Target URL.
    url: String,
}

impl WebhookClient {
    /// Create a client for `url` whose requests give up after `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Internal, "Failed to build HTTP client", e)
            })?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Post a payload.
    pub async fn post(&self, payload: &WebhookPayload) -> AppResult<()> {
        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                let message = format!("Webhook request failed: {e}");
                AppError::with_source(ErrorKind::Delivery, message, e)
            })?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(status = status.as_u16(), "Webhook delivered");
            return Ok(());
        }

        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        Err(AppError::delivery(format!(
            "Webhook error {}: {}",
            status.as_u16(),
            body
        )))
    }
}
