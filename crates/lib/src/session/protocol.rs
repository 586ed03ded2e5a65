//! Sidecar WebSocket protocol: JSON text frames in both directions.
//!
//! Gateway → sidecar: `{ "requestId", "type", ...command fields }`.
//! Sidecar → gateway: lifecycle events, inbound messages, and `result` replies keyed by `requestId`.

use serde::{Deserialize, Serialize};

use super::InboundMessage;

/// Command sent to the sidecar.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SidecarCommand {
    Initialize,
    Logout,
    #[serde(rename_all = "camelCase")]
    GetChat { chat_id: String },
    #[serde(rename_all = "camelCase")]
    SendMessage { chat_id: String, text: String },
    #[serde(rename_all = "camelCase")]
    FetchMessages { chat_id: String, limit: usize },
}

impl SidecarCommand {
    pub fn name(&self) -> &'static str {
        match self {
            SidecarCommand::Initialize => "initialize",
            SidecarCommand::Logout => "logout",
            SidecarCommand::GetChat { .. } => "getChat",
            SidecarCommand::SendMessage { .. } => "sendMessage",
            SidecarCommand::FetchMessages { .. } => "fetchMessages",
        }
    }
}

/// Wire request: command plus correlation id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SidecarRequest {
    pub request_id: String,
    #[serde(flatten)]
    pub command: SidecarCommand,
}

/// Frame received from the sidecar.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SidecarFrame {
    Qr {
        qr: String,
    },
    Authenticated,
    Ready,
    Disconnected {
        #[serde(default)]
        reason: Option<String>,
    },
    Message {
        message: InboundMessage,
    },
    #[serde(rename_all = "camelCase")]
    Result {
        request_id: String,
        ok: bool,
        #[serde(default)]
        payload: Option<serde_json::Value>,
        #[serde(default)]
        error: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_flattens_command_fields() {
        let req = SidecarRequest {
            request_id: "r1".to_string(),
            command: SidecarCommand::SendMessage {
                chat_id: "1234@c.us".to_string(),
                text: "hi".to_string(),
            },
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(
            v,
            json!({"requestId": "r1", "type": "sendMessage", "chatId": "1234@c.us", "text": "hi"})
        );
    }

    #[test]
    fn unit_commands_serialize_type_only() {
        let req = SidecarRequest {
            request_id: "r2".to_string(),
            command: SidecarCommand::Logout,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v, json!({"requestId": "r2", "type": "logout"}));
    }

    #[test]
    fn parses_lifecycle_frames() {
        let f: SidecarFrame = serde_json::from_str(r#"{"type":"qr","qr":"2@abc"}"#).unwrap();
        assert_eq!(f, SidecarFrame::Qr { qr: "2@abc".to_string() });
        let f: SidecarFrame = serde_json::from_str(r#"{"type":"ready"}"#).unwrap();
        assert_eq!(f, SidecarFrame::Ready);
        let f: SidecarFrame = serde_json::from_str(r#"{"type":"disconnected"}"#).unwrap();
        assert_eq!(f, SidecarFrame::Disconnected { reason: None });
    }

    #[test]
    fn parses_inbound_message_frame() {
        let f: SidecarFrame = serde_json::from_value(json!({
            "type": "message",
            "message": {
                "id": "m1",
                "from": "5511@c.us",
                "to": "5522@c.us",
                "body": "oi",
                "timestamp": 1700000000,
                "chatId": "5511@c.us"
            }
        }))
        .unwrap();
        let SidecarFrame::Message { message } = f else {
            panic!("expected message frame");
        };
        assert_eq!(message.chat_id, "5511@c.us");
        assert_eq!(message.timestamp, 1_700_000_000);
    }

    #[test]
    fn parses_result_frame() {
        let f: SidecarFrame = serde_json::from_str(
            r#"{"type":"result","requestId":"r9","ok":false,"error":"chat not found"}"#,
        )
        .unwrap();
        assert_eq!(
            f,
            SidecarFrame::Result {
                request_id: "r9".to_string(),
                ok: false,
                payload: None,
                error: Some("chat not found".to_string()),
            }
        );
    }

    #[test]
    fn unknown_frame_type_is_an_error() {
        assert!(serde_json::from_str::<SidecarFrame>(r#"{"type":"battery","level":3}"#).is_err());
    }
}
