use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {context}: {message}")]
    Parse { context: String, message: String },

    #[error("No authentication method available")]
    NoCredential,

    #[error("Credential not found: {0}")]
    CredentialNotFound(String),

    #[error("Invalid auth type: {0} (expected oauth1, oauth2 or app)")]
    InvalidAuthType(String),

    #[error("OAuth state mismatch: expected {expected}, got {actual}")]
    StateMismatch { expected: String, actual: String },

    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    #[error("Timed out waiting for {operation} after {timeout_secs}s")]
    OperationTimeout { operation: String, timeout_secs: u64 },

    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    #[error("Callback listener failed: {0}")]
    Listener(String),
}

impl AuthError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AuthError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(context: impl Into<String>, message: impl ToString) -> Self {
        AuthError::Parse {
            context: context.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
