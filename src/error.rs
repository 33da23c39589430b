use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum CodeflowError {
    #[error("Transport error: {0}")]
    TransportError(Box<dyn std::error::Error + Send + Sync>),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("Unexpected response shape: {0}")]
    UnexpectedResponseShape(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Error in config {}: {detail}", path.display())]
    ConfigError { path: PathBuf, detail: String },

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Cannot decode token payload: {0}")]
    DecodeError(String),

    #[error("Cannot parse token claims: {0}")]
    ParseError(String),

    #[error("An authorization request is already pending")]
    AuthorizationPending,

    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    #[error("Timed out waiting for authorization after {}s", .0.as_secs())]
    AuthorizationTimeout(Duration),

    #[error("Cannot present authorization page: {0}")]
    PresentationError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CodeflowError {
    /// Error code string for structured JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            CodeflowError::TransportError(_) => "transport_error",
            CodeflowError::HttpStatus { .. } => "transport_error",
            CodeflowError::ProtocolError(_) => "protocol_error",
            CodeflowError::UnexpectedResponseShape(_) => "protocol_error",
            CodeflowError::ConfigurationError(_) => "configuration_error",
            CodeflowError::ConfigError { .. } => "config_error",
            CodeflowError::MalformedToken(_) => "malformed_token",
            CodeflowError::DecodeError(_) => "decode_error",
            CodeflowError::ParseError(_) => "parse_error",
            CodeflowError::AuthorizationPending => "authorization_pending",
            CodeflowError::AuthorizationDenied(_) => "authorization_denied",
            CodeflowError::AuthorizationTimeout(_) => "timeout",
            CodeflowError::PresentationError(_) => "presentation_error",
            CodeflowError::IoError(_) => "io_error",
        }
    }

    /// HTTP status reported by the server, when the failure carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            CodeflowError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        if let Some(status) = self.status() {
            obj.insert("status".into(), serde_json::Value::from(status));
        }
        obj.insert("message".into(), serde_json::Value::String(self.to_string()));
        obj.insert("code".into(), serde_json::Value::String(self.code().to_string()));
        serde_json::json!({ "error": obj })
    }
}
