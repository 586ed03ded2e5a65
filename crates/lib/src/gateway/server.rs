//! Gateway HTTP server: QR login, status, outbound send, forced logout.

use crate::config::Config;
use crate::gateway::events::spawn_event_dispatcher;
use crate::gateway::protocol::{
    ErrorResponse, QrResponse, SendMessageRequest, StatusResponse, SuccessResponse,
    MSG_DISCONNECTED, MSG_LOGOUT_FAILED, MSG_QR_NOT_READY, MSG_QR_RENDER_FAILED,
    MSG_REINIT_SCHEDULED, MSG_SEND_FAILED, MSG_SEND_FIELDS_REQUIRED, MSG_SENT,
};
use crate::qr;
use crate::relay::WebhookRelay;
use crate::session::{SessionAdapter, SessionError, SidecarSession};
use crate::status::StatusTracker;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};

/// Shared state for the gateway handlers and the event dispatcher.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    /// QR payload and connected flag, driven by session lifecycle events.
    pub status: Arc<StatusTracker>,
    pub session: Arc<dyn SessionAdapter>,
    /// Forwards inbound messages; disabled when no webhook url is configured.
    pub relay: WebhookRelay,
}

impl GatewayState {
    pub fn new(config: Config, session: Arc<dyn SessionAdapter>) -> Self {
        let relay = WebhookRelay::new(
            config.webhook.url.clone(),
            Duration::from_secs(config.webhook.timeout_secs),
        );
        Self {
            config: Arc::new(config),
            status: Arc::new(StatusTracker::new()),
            session,
            relay,
        }
    }
}

/// Build the router (shared between production startup and tests). Any origin may call it.
pub fn build_router(state: GatewayState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health_http))
        .route("/send-message", post(send_message))
        .route("/connect", get(connect_qr))
        .route("/status", get(status_http))
        .route("/disconnect", post(disconnect))
        .layer(cors)
        .with_state(state)
}

/// Run the gateway: start the sidecar session, dispatch its events, and serve HTTP on
/// `config.gateway.bind:config.gateway.port`. The listener comes up right away, before the
/// session is ready. Blocks until shutdown (e.g. Ctrl+C).
pub async fn run_gateway(config: Config) -> Result<()> {
    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let session = Arc::new(SidecarSession::new(
        config.session.sidecar_url.clone(),
        config.session.request_timeout(),
    ));
    let (events_tx, events_rx) = mpsc::channel(64);
    let state = GatewayState::new(config, session.clone());

    match state.relay.url() {
        Some(url) => log::info!("inbound messages will be forwarded to {}", url),
        None => log::warn!("no webhook url configured; inbound messages will not be forwarded"),
    }

    let _dispatcher = spawn_event_dispatcher(state.clone(), events_rx);
    let link = session.clone().start(events_tx);

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(session, link))
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
/// Stops the sidecar link and waits for its loop to finish.
async fn shutdown_signal(session: Arc<SidecarSession>, link: JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                log::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, closing sidecar link and draining connections");

    session.stop();
    let _ = link.await;
}

/// Re-initialize the session once after `delay`. Not cancellable; fires even if the session
/// reconnected in the meantime.
pub fn schedule_reinitialize(session: Arc<dyn SessionAdapter>, delay: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        log::info!("re-initializing session after logout");
        if let Err(e) = session.initialize().await {
            log::error!("session re-initialization failed: {}", e);
        }
    })
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    let connected = state.status.is_connected().await;
    Json(json!({
        "runtime": "running",
        "port": state.config.gateway.port,
        "connected": connected,
    }))
}

async fn deliver(session: &dyn SessionAdapter, to: &str, text: &str) -> Result<(), SessionError> {
    let chat = session.get_chat(to).await?;
    session.send_message(&chat, text).await
}

/// POST /send-message: `{to, message}`; resolves the chat and sends the text.
async fn send_message(State(state): State<GatewayState>, body: Bytes) -> Response {
    let req: SendMessageRequest = serde_json::from_slice(&body).unwrap_or_default();
    let Some((to, message)) = req.fields() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(MSG_SEND_FIELDS_REQUIRED)),
        )
            .into_response();
    };
    match deliver(state.session.as_ref(), to, message).await {
        Ok(()) => (StatusCode::OK, Json(SuccessResponse::ok(MSG_SENT))).into_response(),
        Err(e) => {
            log::error!("sending message to {} failed: {}", to, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(MSG_SEND_FAILED)),
            )
                .into_response()
        }
    }
}

/// GET /connect: the current login QR code as a PNG data URL.
async fn connect_qr(State(state): State<GatewayState>) -> Response {
    let Some(payload) = state.status.qr_payload().await else {
        return (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(MSG_QR_NOT_READY))).into_response();
    };
    match qr::to_data_url(&payload) {
        Ok(qr_code) => (StatusCode::OK, Json(QrResponse { qr_code })).into_response(),
        Err(e) => {
            log::error!("rendering QR code failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(MSG_QR_RENDER_FAILED)),
            )
                .into_response()
        }
    }
}

/// GET /status: `{connected}`.
async fn status_http(State(state): State<GatewayState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        connected: state.status.is_connected().await,
    })
}

/// POST /disconnect: log out and schedule a re-initialization so a fresh QR is issued.
/// Reports `success: true` even when logout fails, since the re-initialization runs regardless.
async fn disconnect(State(state): State<GatewayState>) -> Response {
    state.status.clear_qr().await;
    let result = state.session.logout().await;
    schedule_reinitialize(state.session.clone(), state.config.session.reinit_delay());
    match result {
        Ok(()) => {
            log::info!("session logged out on request");
            (StatusCode::OK, Json(SuccessResponse::ok(MSG_DISCONNECTED))).into_response()
        }
        Err(e) => {
            log::error!("logout failed: {}", e);
            let body = SuccessResponse {
                success: true,
                message: MSG_REINIT_SCHEDULED.to_string(),
                error: Some(MSG_LOGOUT_FAILED.to_string()),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}
