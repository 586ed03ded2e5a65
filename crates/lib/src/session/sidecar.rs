//! Sidecar session: the browser-automated client runs in a separate process and is reached
//! over a WebSocket. Requests are correlated with replies by `requestId`; everything else the
//! sidecar sends is turned into a [`SessionEvent`].

use super::protocol::{SidecarCommand, SidecarFrame, SidecarRequest};
use super::{Chat, ChatMessage, SessionAdapter, SessionError, SessionEvent};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex, Notify, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

const RECONNECT_DELAY: Duration = Duration::from_secs(2);
const LINK_LOST_REASON: &str = "sidecar link lost";

type Reply = Result<Option<serde_json::Value>, String>;

/// Session adapter backed by a WebSocket sidecar.
pub struct SidecarSession {
    url: String,
    request_timeout: Duration,
    running: AtomicBool,
    shutdown: Notify,
    /// Writer for the current link; `None` while disconnected.
    outbound: RwLock<Option<mpsc::Sender<String>>>,
    pending: Mutex<HashMap<String, oneshot::Sender<Reply>>>,
}

impl SidecarSession {
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            request_timeout,
            running: AtomicBool::new(false),
            shutdown: Notify::new(),
            outbound: RwLock::new(None),
            pending: Mutex::new(HashMap::new()),
        }
    }

    fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the link loop: connect, initialize the client, forward events; reconnect when the link drops.
    /// Returns a handle to await on shutdown.
    pub fn start(self: Arc<Self>, events_tx: mpsc::Sender<SessionEvent>) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        log::info!("sidecar session: starting link loop to {}", self.url);
        tokio::spawn(async move {
            run_link_loop(self, events_tx).await;
        })
    }

    /// Stop the link loop and close the current link.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_waiters();
    }

    /// Serve one established link until it closes. Returns false when the event receiver is gone.
    async fn run_link(
        self: &Arc<Self>,
        ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
        events_tx: &mpsc::Sender<SessionEvent>,
    ) -> bool {
        let (mut sink, mut stream) = ws.split();
        let (out_tx, mut out_rx) = mpsc::channel::<String>(64);
        *self.outbound.write().await = Some(out_tx);

        // A fresh link means a fresh sidecar client; bring it up so it issues a QR or resumes.
        let session = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = session.initialize().await {
                log::warn!("sidecar session: initialize failed: {}", e);
            }
        });

        // Armed before the running check so a concurrent stop() is never missed.
        let shutdown = self.shutdown.notified();
        tokio::pin!(shutdown);
        shutdown.as_mut().enable();

        let mut receiver_open = true;
        while self.running() {
            tokio::select! {
                _ = &mut shutdown => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
                out = out_rx.recv() => {
                    let Some(text) = out else { break };
                    if let Err(e) = sink.send(Message::Text(text)).await {
                        log::debug!("sidecar session: write failed: {}", e);
                        break;
                    }
                }
                msg = stream.next() => {
                    let Some(Ok(msg)) = msg else { break };
                    match msg {
                        Message::Text(text) => {
                            if !self.handle_frame(&text, events_tx).await {
                                receiver_open = false;
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }
            }
        }

        *self.outbound.write().await = None;
        // Dropping the reply senders fails every in-flight request with `Closed`.
        self.pending.lock().await.clear();
        receiver_open
    }

    /// Route one incoming frame. Returns false when the event receiver is gone.
    async fn handle_frame(&self, text: &str, events_tx: &mpsc::Sender<SessionEvent>) -> bool {
        let frame: SidecarFrame = match serde_json::from_str(text) {
            Ok(f) => f,
            Err(e) => {
                log::debug!("sidecar session: ignoring frame: {}", e);
                return true;
            }
        };
        let event = match frame {
            SidecarFrame::Qr { qr } => SessionEvent::Qr(qr),
            SidecarFrame::Authenticated => SessionEvent::Authenticated,
            SidecarFrame::Ready => SessionEvent::Ready,
            SidecarFrame::Disconnected { reason } => SessionEvent::Disconnected { reason },
            SidecarFrame::Message { message } => SessionEvent::Message(message),
            SidecarFrame::Result {
                request_id,
                ok,
                payload,
                error,
            } => {
                let reply = if ok {
                    Ok(payload)
                } else {
                    Err(error.unwrap_or_else(|| "unknown sidecar error".to_string()))
                };
                match self.pending.lock().await.remove(&request_id) {
                    Some(tx) => {
                        let _ = tx.send(reply);
                    }
                    None => log::debug!("sidecar session: reply for unknown request {}", request_id),
                }
                return true;
            }
        };
        events_tx.send(event).await.is_ok()
    }

    /// Add a reply slot for `request_id` on the link behind `link`. Fails with `Closed` when that
    /// link went away in the meantime, since its teardown may already have cleared `pending`.
    async fn register_pending(
        &self,
        request_id: &str,
        link: &mpsc::Sender<String>,
    ) -> Result<oneshot::Receiver<Reply>, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending.lock().await.insert(request_id.to_string(), reply_tx);
        let same_link = self
            .outbound
            .read()
            .await
            .as_ref()
            .is_some_and(|current| current.same_channel(link));
        if !same_link {
            self.pending.lock().await.remove(request_id);
            return Err(SessionError::Closed);
        }
        Ok(reply_rx)
    }

    /// Send a command and wait for its reply payload.
    async fn request(&self, command: SidecarCommand) -> Result<Option<serde_json::Value>, SessionError> {
        let tx = self
            .outbound
            .read()
            .await
            .clone()
            .ok_or(SessionError::NotConnected)?;
        let request_id = uuid::Uuid::new_v4().to_string();
        let name = command.name();
        let text = serde_json::to_string(&SidecarRequest {
            request_id: request_id.clone(),
            command,
        })
        .map_err(|e| SessionError::Protocol(e.to_string()))?;

        let reply_rx = self.register_pending(&request_id, &tx).await?;
        if tx.send(text).await.is_err() {
            self.pending.lock().await.remove(&request_id);
            return Err(SessionError::Closed);
        }
        log::debug!("sidecar session: sent {} ({})", name, request_id);

        match tokio::time::timeout(self.request_timeout, reply_rx).await {
            Ok(Ok(Ok(payload))) => Ok(payload),
            Ok(Ok(Err(e))) => Err(SessionError::Remote(e)),
            Ok(Err(_)) => Err(SessionError::Closed),
            Err(_) => {
                self.pending.lock().await.remove(&request_id);
                Err(SessionError::Timeout(self.request_timeout))
            }
        }
    }
}

async fn run_link_loop(session: Arc<SidecarSession>, events_tx: mpsc::Sender<SessionEvent>) {
    while session.running() {
        match tokio_tungstenite::connect_async(session.url.as_str()).await {
            Ok((ws, _)) => {
                log::info!("sidecar session: connected to {}", session.url);
                if !session.run_link(ws, &events_tx).await {
                    log::debug!("sidecar session: event receiver closed, stopping loop");
                    return;
                }
                if !session.running() {
                    break;
                }
                log::warn!("sidecar session: link to {} lost", session.url);
                let event = SessionEvent::Disconnected {
                    reason: Some(LINK_LOST_REASON.to_string()),
                };
                if events_tx.send(event).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                log::debug!("sidecar session: connect to {} failed: {}", session.url, e);
            }
        }
        let shutdown = session.shutdown.notified();
        tokio::pin!(shutdown);
        shutdown.as_mut().enable();
        if !session.running() {
            break;
        }
        tokio::select! {
            _ = shutdown => {}
            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
        }
    }
    log::info!("sidecar session: link loop stopped");
}

fn decode<T: DeserializeOwned>(payload: Option<serde_json::Value>) -> Result<T, SessionError> {
    let value = payload.ok_or_else(|| SessionError::Protocol("missing reply payload".to_string()))?;
    serde_json::from_value(value).map_err(|e| SessionError::Protocol(e.to_string()))
}

#[async_trait]
impl SessionAdapter for SidecarSession {
    async fn initialize(&self) -> Result<(), SessionError> {
        self.request(SidecarCommand::Initialize).await.map(|_| ())
    }

    async fn logout(&self) -> Result<(), SessionError> {
        self.request(SidecarCommand::Logout).await.map(|_| ())
    }

    async fn get_chat(&self, chat_id: &str) -> Result<Chat, SessionError> {
        let payload = self
            .request(SidecarCommand::GetChat {
                chat_id: chat_id.to_string(),
            })
            .await?;
        decode(payload)
    }

    async fn send_message(&self, chat: &Chat, text: &str) -> Result<(), SessionError> {
        self.request(SidecarCommand::SendMessage {
            chat_id: chat.id.clone(),
            text: text.to_string(),
        })
        .await
        .map(|_| ())
    }

    async fn fetch_messages(&self, chat: &Chat, limit: usize) -> Result<Vec<ChatMessage>, SessionError> {
        let payload = self
            .request(SidecarCommand::FetchMessages {
                chat_id: chat.id.clone(),
                limit,
            })
            .await?;
        decode(payload)
    }
}
