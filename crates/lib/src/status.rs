//! Connection status: the latest QR payload and the connected flag.
//!
//! Single instance per gateway, shared by reference. Mutated only from session lifecycle
//! events (and the QR clear on a logout request); read by the HTTP handlers.

use crate::session::SessionEvent;
use serde::Serialize;
use tokio::sync::RwLock;

/// Snapshot of the tracked state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionState {
    /// Most recently issued login QR payload; cleared on disconnect or logout request.
    pub qr_payload: Option<String>,
    pub connected: bool,
}

#[derive(Debug, Default)]
pub struct StatusTracker {
    inner: RwLock<ConnectionState>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a lifecycle event. Message events do not touch the state.
    pub async fn apply(&self, event: &SessionEvent) {
        match event {
            SessionEvent::Qr(payload) => {
                self.inner.write().await.qr_payload = Some(payload.clone());
            }
            SessionEvent::Ready => {
                self.inner.write().await.connected = true;
            }
            SessionEvent::Disconnected { .. } => {
                let mut g = self.inner.write().await;
                g.connected = false;
                g.qr_payload = None;
            }
            SessionEvent::Authenticated | SessionEvent::Message(_) => {}
        }
    }

    /// Drop the stored QR payload (a logout was requested; the old code is void).
    pub async fn clear_qr(&self) {
        self.inner.write().await.qr_payload = None;
    }

    pub async fn qr_payload(&self) -> Option<String> {
        self.inner.read().await.qr_payload.clone()
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.read().await.connected
    }

    pub async fn snapshot(&self) -> ConnectionState {
        self.inner.read().await.clone()
    }
}
