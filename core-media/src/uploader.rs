//! Chunked media upload
//!
//! Drives the INIT, APPEND, FINALIZE and STATUS commands of the media upload
//! endpoint for one file.
//!
//! # Workflow
//!
//! ```text
//! Created ─init─▶ Initialized ─append─▶ Appended ─finalize─▶ Finalized
//!                                                     │
//!                                                     └─▶ Processing ─poll─▶ Succeeded | Failed
//! ```
//!
//! Chunks are sent strictly in order. The first failed APPEND aborts the
//! upload and leaves the session in [`UploadState::Appending`].

use crate::error::{MediaError, Result};
use crate::types::{InitResponse, ProcessingEnvelope, ProcessingState, UploadState};
use bridge_traits::http::{HttpMethod, MultipartForm};
use bytes::Bytes;
use core_api::{ApiClient, RequestOptions, MEDIA_UPLOAD_ENDPOINT};
use core_auth::AuthScheme;
use core_runtime::logging::strip_path;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, instrument, warn};

/// Size of each APPEND segment.
pub const CHUNK_SIZE: usize = 4 * 1024 * 1024;

const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Request options shared by every command of an upload.
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub auth: Option<AuthScheme>,
    pub username: Option<String>,
    pub headers: Vec<String>,
}

impl UploadOptions {
    fn request(&self, method: HttpMethod, endpoint: String) -> RequestOptions {
        RequestOptions::new(method, endpoint)
            .headers(self.headers.iter().cloned())
            .auth_opt(self.auth)
            .username_opt(self.username.clone())
    }
}

/// One media upload session.
pub struct MediaUploader {
    api: Arc<ApiClient>,
    path: Option<PathBuf>,
    file_size: u64,
    media_id: String,
    media_key: Option<String>,
    expires_after_secs: Option<u64>,
    state: UploadState,
    options: UploadOptions,
}

impl MediaUploader {
    /// Session for uploading the file at `path`.
    ///
    /// # Errors
    ///
    /// - [`MediaError::Io`] if the file cannot be inspected
    /// - [`MediaError::NotARegularFile`] for directories and other non-files
    pub fn new(
        api: Arc<ApiClient>,
        path: impl AsRef<Path>,
        options: UploadOptions,
    ) -> Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|e| MediaError::io(path, e))?;
        if !metadata.is_file() {
            return Err(MediaError::NotARegularFile(path.to_path_buf()));
        }

        Ok(Self {
            api,
            path: Some(path.to_path_buf()),
            file_size: metadata.len(),
            media_id: String::new(),
            media_key: None,
            expires_after_secs: None,
            state: UploadState::Created,
            options,
        })
    }

    /// Session for an upload that already has a media ID, for status checks.
    pub fn with_media_id(
        api: Arc<ApiClient>,
        media_id: impl Into<String>,
        options: UploadOptions,
    ) -> Self {
        Self {
            api,
            path: None,
            file_size: 0,
            media_id: media_id.into(),
            media_key: None,
            expires_after_secs: None,
            state: UploadState::Finalized,
            options,
        }
    }

    pub fn media_id(&self) -> &str {
        &self.media_id
    }

    pub fn media_key(&self) -> Option<&str> {
        self.media_key.as_deref()
    }

    pub fn expires_after_secs(&self) -> Option<u64> {
        self.expires_after_secs
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    fn require_media_id(&self) -> Result<&str> {
        if self.media_id.is_empty() {
            return Err(MediaError::MediaIdNotSet);
        }
        Ok(&self.media_id)
    }

    fn command_endpoint(params: &[(&str, &str)]) -> Result<String> {
        let query = serde_urlencoded::to_string(params)
            .map_err(|e| MediaError::parse("media command", e))?;
        Ok(format!("{}?{}", MEDIA_UPLOAD_ENDPOINT, query))
    }

    /// Announce the upload and capture the media ID.
    #[instrument(skip(self), fields(total_bytes = self.file_size))]
    pub async fn init(&mut self, media_type: &str, media_category: &str) -> Result<Value> {
        if !self.media_id.is_empty() {
            return Err(MediaError::AlreadyInitialized(self.media_id.clone()));
        }

        let total_bytes = self.file_size.to_string();
        let endpoint = Self::command_endpoint(&[
            ("command", "INIT"),
            ("total_bytes", &total_bytes),
            ("media_type", media_type),
            ("media_category", media_category),
        ])?;

        let response = self
            .api
            .send(&self.options.request(HttpMethod::Post, endpoint))
            .await?;

        let init: InitResponse = serde_json::from_value(response.clone())
            .map_err(|e| MediaError::parse("INIT response", e))?;
        if init.data.id.is_empty() {
            return Err(MediaError::parse("INIT response", "empty media id"));
        }

        self.media_id = init.data.id;
        self.media_key = init.data.media_key;
        self.expires_after_secs = init.data.expires_after_secs;
        self.state = UploadState::Initialized;

        info!(
            media_id = %self.media_id,
            file = %self.path.as_deref().map(media_file_name).unwrap_or_default(),
            "Media upload initialized"
        );
        Ok(response)
    }

    /// Send the file in [`CHUNK_SIZE`] segments. Returns the segment count.
    #[instrument(skip(self), fields(media_id = %self.media_id))]
    pub async fn append(&mut self) -> Result<usize> {
        let media_id = self.require_media_id()?.to_string();
        let path = self.path.clone().ok_or(MediaError::NoSource)?;
        let file_name = media_file_name(&path);

        let mut file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| MediaError::io(&path, e))?;

        self.state = UploadState::Appending;

        let mut segment_index = 0usize;
        let mut uploaded = 0u64;
        loop {
            let chunk = read_chunk(&mut file, CHUNK_SIZE)
                .await
                .map_err(|e| MediaError::io(&path, e))?;
            if chunk.is_empty() {
                break;
            }
            let chunk_len = chunk.len() as u64;

            let form = MultipartForm::new()
                .text("command", "APPEND")
                .text("media_id", media_id.clone())
                .text("segment_index", segment_index.to_string())
                .file("media", file_name.clone(), Bytes::from(chunk));

            let options = self
                .options
                .request(HttpMethod::Post, MEDIA_UPLOAD_ENDPOINT.to_string());
            if let Err(e) = self.api.send_multipart(&options, form).await {
                warn!(segment_index, error = %e, "APPEND failed");
                return Err(e.into());
            }

            uploaded += chunk_len;
            segment_index += 1;
            debug!(
                segment_index,
                uploaded,
                total = self.file_size,
                "Segment uploaded"
            );
        }

        self.state = UploadState::Appended;
        info!(segments = segment_index, bytes = uploaded, "Media upload complete");
        Ok(segment_index)
    }

    /// Complete the upload. Moves to `Processing` when the server reports
    /// asynchronous processing.
    #[instrument(skip(self), fields(media_id = %self.media_id))]
    pub async fn finalize(&mut self) -> Result<Value> {
        let media_id = self.require_media_id()?;
        let endpoint =
            Self::command_endpoint(&[("command", "FINALIZE"), ("media_id", media_id)])?;

        let response = self
            .api
            .send(&self.options.request(HttpMethod::Post, endpoint))
            .await?;

        let processing = serde_json::from_value::<ProcessingEnvelope>(response.clone())
            .ok()
            .and_then(ProcessingEnvelope::into_info);

        self.state = match processing.map(|p| p.state) {
            Some(ProcessingState::Succeeded) => UploadState::Succeeded,
            Some(ProcessingState::Failed) => UploadState::Failed,
            Some(_) => UploadState::Processing,
            None => UploadState::Finalized,
        };

        info!(state = %self.state, "Media upload finalized");
        Ok(response)
    }

    /// One STATUS request.
    #[instrument(skip(self), fields(media_id = %self.media_id))]
    pub async fn check_status(&self) -> Result<Value> {
        let media_id = self.require_media_id()?;
        let endpoint = Self::command_endpoint(&[("command", "STATUS"), ("media_id", media_id)])?;

        let response = self
            .api
            .send(&self.options.request(HttpMethod::Get, endpoint))
            .await?;
        Ok(response)
    }

    /// Poll STATUS until processing succeeds or fails.
    ///
    /// Sleeps `max(check_after_secs, 1s)` between polls. A status without
    /// processing info means there is nothing to wait for.
    ///
    /// # Errors
    ///
    /// [`MediaError::ProcessingFailed`] with the status payload when the
    /// server reports `failed`.
    #[instrument(skip(self), fields(media_id = %self.media_id))]
    pub async fn wait_for_processing(&mut self) -> Result<Value> {
        self.require_media_id()?;

        loop {
            let response = self.check_status().await?;
            let envelope: ProcessingEnvelope = serde_json::from_value(response.clone())
                .map_err(|e| MediaError::parse("STATUS response", e))?;

            let info = match envelope.into_info() {
                Some(info) => info,
                None => {
                    self.state = UploadState::Succeeded;
                    return Ok(response);
                }
            };

            match info.state {
                ProcessingState::Succeeded => {
                    self.state = UploadState::Succeeded;
                    info!("Media processing complete");
                    return Ok(response);
                }
                ProcessingState::Failed => {
                    self.state = UploadState::Failed;
                    warn!("Media processing failed");
                    return Err(MediaError::ProcessingFailed(response));
                }
                ProcessingState::Pending
                | ProcessingState::InProgress
                | ProcessingState::Unknown => {
                    self.state = UploadState::Processing;
                    let delay = info
                        .check_after_secs
                        .map(Duration::from_secs)
                        .unwrap_or_default()
                        .max(MIN_POLL_INTERVAL);
                    debug!(
                        progress_percent = info.progress_percent.unwrap_or(0),
                        delay_secs = delay.as_secs(),
                        "Media processing in progress"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Basename used for the multipart file part and in logs.
pub(crate) fn media_file_name(path: &Path) -> String {
    match strip_path(&path.to_string_lossy()) {
        "" => "media".to_string(),
        name => name.to_string(),
    }
}

/// Read up to `size` bytes, stopping early only at end of file.
async fn read_chunk<R>(reader: &mut R, size: usize) -> std::io::Result<Vec<u8>>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut buffer = Vec::with_capacity(size);
    let mut limited = reader.take(size as u64);
    limited.read_to_end(&mut buffer).await?;
    Ok(buffer)
}
