//! Egress error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EgressError {
    /// Upstream answered with a status >= 400
    #[error("Provider error {status_code}: {message}")]
    ProviderError { status_code: u16, message: String },

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, EgressError>;

impl From<EgressError> for twinroute_core::Error {
    fn from(err: EgressError) -> Self {
        match err {
            EgressError::ProviderError {
                status_code,
                message,
            } => twinroute_core::Error::Upstream {
                status: status_code,
                body: message,
            },
            EgressError::HttpError(e) => twinroute_core::Error::Transport(e.to_string()),
            EgressError::ParseError(msg) => {
                twinroute_core::Error::Transport(format!("invalid upstream response: {}", msg))
            }
            EgressError::ConfigError(msg) => twinroute_core::Error::Internal(msg),
        }
    }
}
