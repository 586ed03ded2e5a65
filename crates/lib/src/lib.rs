//! wagate core library: session adapter, status tracking, QR rendering, webhook relay,
//! and the HTTP gateway used by the CLI.

pub mod config;
pub mod gateway;
pub mod qr;
pub mod relay;
pub mod session;
pub mod status;
