use core_api::ApiError;
use core_auth::AuthError;
use core_media::MediaError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),
}

/// Coarse classification of every error the core reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Io,
    Parse,
    Auth,
    /// Non-2xx response from the API
    Api,
    /// Media processing failed or the upload sequence was misused
    Protocol,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Io => "io",
            ErrorKind::Parse => "parse",
            ErrorKind::Auth => "auth",
            ErrorKind::Api => "api",
            ErrorKind::Protocol => "protocol",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InitializationFailed(_) => ErrorKind::Io,
            CoreError::Config(_) => ErrorKind::Parse,
            CoreError::Auth(e) => auth_kind(e),
            CoreError::Api(e) => api_kind(e),
            CoreError::Media(e) => media_kind(e),
        }
    }

    /// Response payload for API errors.
    pub fn api_payload(&self) -> Option<&serde_json::Value> {
        match self {
            CoreError::Api(ApiError::Api { body, .. })
            | CoreError::Media(MediaError::Api(ApiError::Api { body, .. })) => Some(body),
            CoreError::Media(MediaError::ProcessingFailed(body)) => Some(body),
            _ => None,
        }
    }
}

fn auth_kind(error: &AuthError) -> ErrorKind {
    match error {
        AuthError::Io { .. } | AuthError::Listener(_) => ErrorKind::Io,
        AuthError::Parse { .. } => ErrorKind::Parse,
        _ => ErrorKind::Auth,
    }
}

fn api_kind(error: &ApiError) -> ErrorKind {
    match error {
        ApiError::Auth(e) => auth_kind(e),
        ApiError::Api { .. } | ApiError::Http(_) => ErrorKind::Api,
        ApiError::Parse { .. } => ErrorKind::Parse,
        ApiError::Transport(_) | ApiError::StreamLineTooLong { .. } | ApiError::Io(_) => {
            ErrorKind::Io
        }
    }
}

fn media_kind(error: &MediaError) -> ErrorKind {
    match error {
        MediaError::Api(e) => api_kind(e),
        MediaError::Io { .. } | MediaError::NotARegularFile(_) | MediaError::NoSource => {
            ErrorKind::Io
        }
        MediaError::Parse { .. } => ErrorKind::Parse,
        MediaError::MediaIdNotSet
        | MediaError::AlreadyInitialized(_)
        | MediaError::MissingAppendMediaId
        | MediaError::ProcessingFailed(_) => ErrorKind::Protocol,
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
