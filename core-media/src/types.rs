use serde::Deserialize;
use std::fmt;

/// Lifecycle of one chunked upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Created,
    Initialized,
    /// Chunks are being sent. An upload left here failed mid-way.
    Appending,
    Appended,
    Finalized,
    /// Finalized, server-side processing still running
    Processing,
    Succeeded,
    Failed,
}

impl UploadState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadState::Succeeded | UploadState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UploadState::Created => "created",
            UploadState::Initialized => "initialized",
            UploadState::Appending => "appending",
            UploadState::Appended => "appended",
            UploadState::Finalized => "finalized",
            UploadState::Processing => "processing",
            UploadState::Succeeded => "succeeded",
            UploadState::Failed => "failed",
        }
    }
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-side processing state reported by FINALIZE and STATUS.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    Pending,
    InProgress,
    Succeeded,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingInfo {
    pub state: ProcessingState,
    #[serde(default)]
    pub check_after_secs: Option<u64>,
    #[serde(default)]
    pub progress_percent: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InitResponse {
    pub data: InitData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InitData {
    pub id: String,
    #[serde(default)]
    pub expires_after_secs: Option<u64>,
    #[serde(default)]
    pub media_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ProcessingEnvelope {
    #[serde(default)]
    pub data: Option<ProcessingData>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ProcessingData {
    #[serde(default)]
    pub processing_info: Option<ProcessingInfo>,
}

impl ProcessingEnvelope {
    pub(crate) fn into_info(self) -> Option<ProcessingInfo> {
        self.data.and_then(|d| d.processing_info)
    }
}
