//! HTTP wire types and the fixed user-facing messages.

use serde::{Deserialize, Serialize};

pub const MSG_SENT: &str = "Mensagem enviada com sucesso.";
pub const MSG_SEND_FIELDS_REQUIRED: &str = "Os campos \"to\" e \"message\" são obrigatórios.";
pub const MSG_SEND_FAILED: &str = "Falha ao enviar a mensagem.";
pub const MSG_QR_NOT_READY: &str = "QR Code ainda não gerado. Tente novamente em alguns segundos.";
pub const MSG_QR_RENDER_FAILED: &str = "Falha ao gerar a imagem do QR Code.";
pub const MSG_DISCONNECTED: &str =
    "Sessão desconectada. Um novo QR Code será gerado em alguns segundos.";
pub const MSG_REINIT_SCHEDULED: &str = "Reinicialização da sessão agendada.";
pub const MSG_LOGOUT_FAILED: &str = "Falha ao encerrar a sessão.";

/// POST /send-message body. Missing, null, and empty fields all count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl SendMessageRequest {
    /// Both fields, when present and non-empty.
    pub fn fields(&self) -> Option<(&str, &str)> {
        let to = self.to.as_deref().filter(|s| !s.is_empty())?;
        let message = self.message.as_deref().filter(|s| !s.is_empty())?;
        Some((to, message))
    }
}

/// `{ success, message, error? }` used by send and disconnect.
#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SuccessResponse {
    pub fn ok(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            error: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: &str) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrResponse {
    pub qr_code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub connected: bool,
}
