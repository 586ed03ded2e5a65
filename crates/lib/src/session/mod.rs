//! Messaging session adapter.
//!
//! The browser-automated messaging client is an external collaborator. The gateway sees it
//! through the [`SessionAdapter`] trait (calls) and a stream of [`SessionEvent`]s (lifecycle
//! and inbound messages) delivered over an mpsc channel.

mod protocol;
mod sidecar;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use sidecar::SidecarSession;

/// Errors raised by a session adapter call.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No live link to the underlying client.
    #[error("session not connected")]
    NotConnected,

    /// The link closed before the reply arrived.
    #[error("session link closed")]
    Closed,

    #[error("session request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The client reported a failure (unknown chat, not logged in, send failure, ...).
    #[error("session error: {0}")]
    Remote(String),

    /// A reply could not be decoded.
    #[error("session protocol error: {0}")]
    Protocol(String),
}

/// A resolved chat handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// One message from a chat's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub body: String,
    /// Unix seconds.
    #[serde(default)]
    pub timestamp: i64,
}

/// A message received by the session, with the id of the chat it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    pub id: String,
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub timestamp: i64,
    pub chat_id: String,
}

/// Events emitted by a session adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A new login QR payload was issued; any previous one is void.
    Qr(String),
    Authenticated,
    Ready,
    Disconnected { reason: Option<String> },
    Message(InboundMessage),
}

/// Call surface of the messaging session.
#[async_trait]
pub trait SessionAdapter: Send + Sync {
    /// Start (or restart) the client so it issues a fresh QR code or resumes a saved session.
    async fn initialize(&self) -> Result<(), SessionError>;

    async fn logout(&self) -> Result<(), SessionError>;

    /// Look up a chat by id (e.g. `5511999999999@c.us`).
    async fn get_chat(&self, chat_id: &str) -> Result<Chat, SessionError>;

    async fn send_message(&self, chat: &Chat, text: &str) -> Result<(), SessionError>;

    /// Most recent messages of a chat, at most `limit`, in the order the client returns them.
    async fn fetch_messages(&self, chat: &Chat, limit: usize) -> Result<Vec<ChatMessage>, SessionError>;
}
