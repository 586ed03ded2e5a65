//! Session event dispatch: lifecycle events update the status tracker in arrival order;
//! inbound messages are relayed to the webhook, each in its own task.

use super::server::GatewayState;
use crate::qr;
use crate::relay::RelayOutcome;
use crate::session::SessionEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Spawn the single dispatcher task. Ends when every event sender is dropped.
pub fn spawn_event_dispatcher(
    state: GatewayState,
    mut events_rx: mpsc::Receiver<SessionEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            handle_event(&state, event).await;
        }
        log::debug!("session event stream closed");
    })
}

/// Apply one event. Message relays are spawned and not awaited.
pub async fn handle_event(state: &GatewayState, event: SessionEvent) {
    match &event {
        SessionEvent::Qr(payload) => {
            log::info!("new login QR code issued; scan it to authenticate");
            match qr::to_terminal(payload) {
                Ok(rendered) => log::info!("\n{}", rendered),
                Err(e) => log::warn!("rendering QR code for terminal failed: {}", e),
            }
        }
        SessionEvent::Authenticated => log::info!("session authenticated"),
        SessionEvent::Ready => log::info!("session ready"),
        SessionEvent::Disconnected { reason } => {
            log::warn!(
                "session disconnected ({})",
                reason.as_deref().unwrap_or("no reason given")
            );
        }
        SessionEvent::Message(_) => {}
    }
    state.status.apply(&event).await;

    if let SessionEvent::Message(msg) = event {
        let relay = state.relay.clone();
        let session = state.session.clone();
        tokio::spawn(async move {
            let id = msg.id.clone();
            match relay.relay(session.as_ref(), msg).await {
                Ok(RelayOutcome::Delivered) | Ok(RelayOutcome::Skipped) => {}
                Err(e) => log::warn!("webhook relay for message {} failed: {}", id, e),
            }
        });
    }
}
