//! Shared ingress types and utilities

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{error::Category, json};
use thiserror::Error;
use twinroute_core::ApiFormat;

/// Request ID for tracing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a new `req_<hex>` request ID
    pub fn generate() -> Self {
        Self(format!("req_{}", uuid::Uuid::new_v4().simple()))
    }

    /// Create from existing string
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ingress error types
#[derive(Debug, Error)]
pub enum IngressError {
    /// Malformed or empty caller input; nothing was sent upstream
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The upstream answered with an error status
    #[error("Upstream returned status {status}")]
    Upstream { status: u16, body: String },

    /// The upstream could not be reached or sent garbage
    #[error("Upstream unavailable: {0}")]
    Transport(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IngressError {
    pub fn status(&self) -> StatusCode {
        match self {
            IngressError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            IngressError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            IngressError::Transport(_) => StatusCode::BAD_GATEWAY,
            IngressError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Upstream HTTP status, if the failure came from the upstream at all
    pub fn upstream_status(&self) -> Option<Option<u16>> {
        match self {
            IngressError::Upstream { status, .. } => Some(Some(*status)),
            IngressError::Transport(_) => Some(None),
            _ => None,
        }
    }

    fn message(&self) -> String {
        match self {
            IngressError::InvalidRequest(msg)
            | IngressError::Transport(msg)
            | IngressError::Internal(msg) => msg.clone(),
            IngressError::Upstream { body, .. } => body.clone(),
        }
    }

    /// OpenAI `error.type` for this failure
    pub fn openai_type(&self) -> &'static str {
        match self.status().as_u16() {
            400 | 404 | 413 | 422 => "invalid_request_error",
            401 => "authentication_error",
            403 => "permission_error",
            429 => "rate_limit_error",
            _ => "server_error",
        }
    }

    /// Anthropic `error.type` for this failure
    pub fn anthropic_type(&self) -> &'static str {
        match self.status().as_u16() {
            400 | 413 | 422 => "invalid_request_error",
            401 => "authentication_error",
            403 => "permission_error",
            404 => "not_found_error",
            429 => "rate_limit_error",
            529 => "overloaded_error",
            _ => "api_error",
        }
    }

    /// `{"error":{"message","type","code"}}`
    pub fn into_openai_response(self) -> Response {
        let status = self.status();
        let body = json!({
            "error": {
                "message": self.message(),
                "type": self.openai_type(),
                "code": status.as_u16(),
            }
        });
        (status, Json(body)).into_response()
    }

    /// `{"type":"error","error":{"type","message"}}`
    pub fn into_anthropic_response(self) -> Response {
        let status = self.status();
        let body = json!({
            "type": "error",
            "error": {
                "type": self.anthropic_type(),
                "message": self.message(),
            }
        });
        (status, Json(body)).into_response()
    }

    pub fn into_response_for(self, listener: ApiFormat) -> Response {
        match listener {
            ApiFormat::OpenAI => self.into_openai_response(),
            ApiFormat::Anthropic => self.into_anthropic_response(),
        }
    }
}

impl IntoResponse for IngressError {
    fn into_response(self) -> Response {
        self.into_openai_response()
    }
}

impl From<twinroute_core::Error> for IngressError {
    fn from(err: twinroute_core::Error) -> Self {
        use twinroute_core::Error;

        match err {
            Error::InvalidRequest(msg) => IngressError::InvalidRequest(msg),
            Error::Upstream { status, body } => IngressError::Upstream { status, body },
            Error::Transport(msg) | Error::Stream(msg) => IngressError::Transport(msg),
            Error::Serialization(e) => IngressError::Internal(e.to_string()),
            Error::Internal(msg) => IngressError::Internal(msg),
            Error::Io(e) => IngressError::Internal(e.to_string()),
        }
    }
}

/// Caller-facing description of a body parse failure. serde's data errors
/// name Rust types (`untagged enum Content`, `struct ChatRequest`); those
/// are replaced by the JSON shape that was expected.
impl From<serde_json::Error> for IngressError {
    fn from(err: serde_json::Error) -> Self {
        // Errors from `from_value` carry no position
        let position = if err.line() > 0 {
            format!(" at line {} column {}", err.line(), err.column())
        } else {
            String::new()
        };
        let detail = match err.classify() {
            Category::Syntax | Category::Eof => format!("malformed JSON{}", position),
            Category::Io => "body could not be read".to_string(),
            Category::Data => {
                let message = err.to_string();
                let message = message.strip_suffix(&position).unwrap_or(&message);
                if message.contains("untagged enum") {
                    format!("a value has an unsupported shape{}", position)
                } else if let Some((head, _)) = message.split_once("expected struct ") {
                    format!("{}expected an object{}", head, position)
                } else if let Some((head, _)) = message.split_once("expected enum ") {
                    format!("{}expected a tagged value{}", head, position)
                } else {
                    format!("{}{}", message, position)
                }
            }
        };
        IngressError::InvalidRequest(format!("Invalid request body: {}", detail))
    }
}

/// Ingress result type
pub type IngressResult<T> = Result<T, IngressError>;
