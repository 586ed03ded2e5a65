//! Webhook relay: forward each inbound message, with recent chat history, to an external endpoint.
//!
//! One best-effort POST per message; failures are returned to the caller for logging and
//! never retried.

use crate::session::{ChatMessage, InboundMessage, SessionAdapter, SessionError};
use serde::Serialize;
use std::time::Duration;

/// Number of most recent chat messages attached to each webhook payload.
pub const HISTORY_LIMIT: usize = 10;

/// JSON body posted to the webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub message_id: String,
    pub from: String,
    pub to: String,
    pub body: String,
    pub timestamp: i64,
    pub chat_id: String,
    pub chat_name: String,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub id: String,
    pub from: String,
    pub body: String,
    pub timestamp: i64,
}

impl From<ChatMessage> for HistoryEntry {
    fn from(m: ChatMessage) -> Self {
        Self {
            id: m.id,
            from: m.from,
            body: m.body,
            timestamp: m.timestamp,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("fetching chat context: {0}")]
    Session(#[from] SessionError),

    #[error("posting to webhook: {0}")]
    Http(#[from] reqwest::Error),
}

/// Outcome of a relay attempt that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Delivered,
    /// No webhook URL configured.
    Skipped,
}

/// Webhook sender. Cheap to clone; holds a pooled HTTP client.
#[derive(Clone)]
pub struct WebhookRelay {
    url: Option<String>,
    client: reqwest::Client,
}

impl WebhookRelay {
    pub fn new(url: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("webhook client with timeout unavailable ({}), using defaults", e);
                reqwest::Client::new()
            });
        Self { url, client }
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Build the payload for `msg` and post it once. Skips without touching the session when no URL is set.
    pub async fn relay(
        &self,
        session: &dyn SessionAdapter,
        msg: InboundMessage,
    ) -> Result<RelayOutcome, RelayError> {
        let Some(url) = self.url.as_deref() else {
            log::warn!("webhook url not configured; inbound message {} not forwarded", msg.id);
            return Ok(RelayOutcome::Skipped);
        };
        let payload = build_payload(session, msg).await?;
        self.client
            .post(url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        log::debug!("webhook: forwarded message {} from {}", payload.message_id, payload.from);
        Ok(RelayOutcome::Delivered)
    }
}

/// Resolve the message's chat and attach its recent history.
pub async fn build_payload(
    session: &dyn SessionAdapter,
    msg: InboundMessage,
) -> Result<WebhookPayload, SessionError> {
    let chat = session.get_chat(&msg.chat_id).await?;
    let messages = session.fetch_messages(&chat, HISTORY_LIMIT).await?;
    // History is oldest first; keep the newest entries in that order.
    let skip = messages.len().saturating_sub(HISTORY_LIMIT);
    let history = messages.into_iter().skip(skip).map(HistoryEntry::from).collect();
    Ok(WebhookPayload {
        message_id: msg.id,
        from: msg.from,
        to: msg.to,
        body: msg.body,
        timestamp: msg.timestamp,
        chat_id: chat.id,
        chat_name: chat.name,
        history,
    })
}
