//! Test doubles shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use lib::config::Config;
use lib::gateway::GatewayState;
use lib::session::{Chat, ChatMessage, SessionAdapter, SessionError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// In-memory session adapter that records calls.
#[derive(Default)]
pub struct FakeSession {
    pub chats: Mutex<HashMap<String, Chat>>,
    pub history: Mutex<Vec<ChatMessage>>,
    pub sent: Mutex<Vec<(String, String)>>,
    pub get_chat_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    pub init_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub fail_logout: AtomicBool,
    pub fail_send: AtomicBool,
}

impl FakeSession {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_chat(self: Arc<Self>, id: &str, name: &str) -> Arc<Self> {
        self.chats.lock().unwrap().insert(
            id.to_string(),
            Chat {
                id: id.to_string(),
                name: name.to_string(),
            },
        );
        self
    }

    pub fn with_history(self: Arc<Self>, messages: Vec<ChatMessage>) -> Arc<Self> {
        *self.history.lock().unwrap() = messages;
        self
    }

    pub fn inits(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionAdapter for FakeSession {
    async fn initialize(&self) -> Result<(), SessionError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn logout(&self) -> Result<(), SessionError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_logout.load(Ordering::SeqCst) {
            Err(SessionError::Remote("browser crashed".to_string()))
        } else {
            Ok(())
        }
    }

    async fn get_chat(&self, chat_id: &str) -> Result<Chat, SessionError> {
        self.get_chat_calls.fetch_add(1, Ordering::SeqCst);
        self.chats
            .lock()
            .unwrap()
            .get(chat_id)
            .cloned()
            .ok_or_else(|| SessionError::Remote(format!("chat {} not found", chat_id)))
    }

    async fn send_message(&self, chat: &Chat, text: &str) -> Result<(), SessionError> {
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(SessionError::NotConnected);
        }
        self.sent
            .lock()
            .unwrap()
            .push((chat.id.clone(), text.to_string()));
        Ok(())
    }

    async fn fetch_messages(&self, _chat: &Chat, _limit: usize) -> Result<Vec<ChatMessage>, SessionError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.history.lock().unwrap().clone())
    }
}

pub fn chat_message(i: usize) -> ChatMessage {
    ChatMessage {
        id: format!("m{}", i),
        from: "5511999990000@c.us".to_string(),
        to: "5511888880000@c.us".to_string(),
        body: format!("message {}", i),
        timestamp: 1_700_000_000 + i as i64,
    }
}

/// Gateway state over a fake session, with a short re-initialization delay.
pub fn test_state(session: Arc<FakeSession>, webhook_url: Option<String>) -> GatewayState {
    let mut config = Config::default();
    config.session.reinit_delay_ms = 20;
    config.webhook.url = webhook_url;
    config.webhook.timeout_secs = 5;
    GatewayState::new(config, session)
}

/// Send one request through the router; returns status and parsed JSON body.
pub async fn call(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };
    let resp = app.clone().oneshot(req).await.expect("response");
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// Start a local webhook receiver; every POSTed JSON body is forwarded on the returned channel.
pub async fn webhook_receiver(status: StatusCode) -> (String, tokio::sync::mpsc::Receiver<serde_json::Value>) {
    use axum::extract::State;
    use axum::routing::post;
    use axum::Json;

    let (tx, rx) = tokio::sync::mpsc::channel(16);
    let app = Router::new()
        .route(
            "/hook",
            post(
                move |State(tx): State<tokio::sync::mpsc::Sender<serde_json::Value>>,
                      Json(body): Json<serde_json::Value>| async move {
                    let _ = tx.send(body).await;
                    status
                },
            ),
        )
        .with_state(tx);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind webhook receiver");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{}/hook", addr), rx)
}
