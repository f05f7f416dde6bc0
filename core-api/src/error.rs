use bridge_traits::error::BridgeError;
use core_auth::AuthError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] BridgeError),

    /// Non-2xx response. `body` is the payload as returned.
    #[error("API error (status {status}): {body}")]
    Api {
        status: u16,
        body: serde_json::Value,
    },

    /// Non-2xx response whose body is not JSON.
    #[error("HTTP error: status {0}")]
    Http(u16),

    #[error("Failed to parse {context}: {message}")]
    Parse { context: String, message: String },

    #[error("Stream line exceeds {max} bytes")]
    StreamLineTooLong { max: usize },

    #[error("Stream read failed: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub(crate) fn parse(context: impl Into<String>, message: impl ToString) -> Self {
        ApiError::Parse {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// HTTP status for response errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } | ApiError::Http(status) => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
