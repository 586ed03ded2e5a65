//! Gateway: HTTP surface over the messaging session.
//!
//! Single port. Handlers read the status tracker or call the session adapter; session events
//! are applied by one dispatcher task, and inbound messages are relayed to the webhook.

mod events;
mod protocol;
mod server;

pub use events::{handle_event, spawn_event_dispatcher};
pub use protocol::{
    SendMessageRequest, MSG_DISCONNECTED, MSG_LOGOUT_FAILED, MSG_QR_NOT_READY, MSG_REINIT_SCHEDULED,
    MSG_SEND_FAILED, MSG_SEND_FIELDS_REQUIRED, MSG_SENT,
};
pub use server::{build_router, run_gateway, schedule_reinitialize, GatewayState};
