use core_api::ApiError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("media ID not set, call init first")]
    MediaIdNotSet,

    #[error("upload already initialized with media ID {0}")]
    AlreadyInitialized(String),

    #[error("{} is not a regular file", .0.display())]
    NotARegularFile(PathBuf),

    #[error("upload session has no source file")]
    NoSource,

    #[error("media_id is required for APPEND command")]
    MissingAppendMediaId,

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Failed to parse {context}: {message}")]
    Parse { context: String, message: String },

    /// The server reported processing as failed. Carries the status payload.
    #[error("media processing failed: {0}")]
    ProcessingFailed(serde_json::Value),
}

impl MediaError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MediaError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(context: impl Into<String>, message: impl ToString) -> Self {
        MediaError::Parse {
            context: context.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MediaError>;
