//! Command-level entry points built on [`MediaUploader`].

use crate::error::{MediaError, Result};
use crate::uploader::{media_file_name, MediaUploader, UploadOptions};
use bridge_traits::http::{HttpMethod, MultipartForm};
use bytes::Bytes;
use core_api::{ApiClient, RequestOptions, MEDIA_UPLOAD_ENDPOINT};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Result of a full upload.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub media_id: String,
    pub finalize: Value,
    /// Final STATUS payload when processing was awaited.
    pub processing: Option<Value>,
}

/// Run INIT, APPEND and FINALIZE for `path`.
///
/// With `wait` set, processing is awaited for video categories only.
pub async fn execute_upload(
    api: Arc<ApiClient>,
    path: impl AsRef<Path>,
    media_type: &str,
    media_category: &str,
    wait: bool,
    options: UploadOptions,
) -> Result<UploadOutcome> {
    let mut uploader = MediaUploader::new(api, path, options)?;

    uploader.init(media_type, media_category).await?;
    uploader.append().await?;
    let finalize = uploader.finalize().await?;

    let processing = if wait && media_category.contains("video") {
        Some(uploader.wait_for_processing().await?)
    } else {
        None
    };

    info!(media_id = %uploader.media_id(), "Media uploaded");
    Ok(UploadOutcome {
        media_id: uploader.media_id().to_string(),
        finalize,
        processing,
    })
}

/// Check, or with `wait` poll until done, the status of an existing upload.
pub async fn execute_status(
    api: Arc<ApiClient>,
    media_id: &str,
    wait: bool,
    options: UploadOptions,
) -> Result<Value> {
    let mut uploader = MediaUploader::with_media_id(api, media_id, options);
    if wait {
        uploader.wait_for_processing().await
    } else {
        uploader.check_status().await
    }
}

/// Whether a raw request is an APPEND that should carry `media_file`.
pub fn is_media_append_request(url: &str, media_file: Option<&str>) -> bool {
    url.contains(MEDIA_UPLOAD_ENDPOINT)
        && url.contains("command=APPEND")
        && media_file.is_some_and(|f| !f.is_empty())
}

fn extract_param(name: &str, url: &str, data: &str) -> Option<String> {
    let needle = format!("{}=", name);
    [url, data].into_iter().find_map(|source| {
        let start = source.find(&needle)? + needle.len();
        let rest = &source[start..];
        let value = rest.split('&').next().unwrap_or_default();
        Some(value.to_string())
    })
}

/// `media_id` from the URL query, else from form data.
pub fn extract_media_id(url: &str, data: &str) -> Option<String> {
    extract_param("media_id", url, data)
}

/// `segment_index` from the URL query, else from form data.
pub fn extract_segment_index(url: &str, data: &str) -> Option<String> {
    extract_param("segment_index", url, data)
}

/// Send a raw APPEND with `media_file` as the `media` part.
///
/// The segment index defaults to `0`.
pub async fn handle_media_append_request(
    api: &ApiClient,
    request: &RequestOptions,
    media_file: impl AsRef<Path>,
) -> Result<Value> {
    let data = request.data.as_deref().unwrap_or_default();
    let media_id = extract_media_id(&request.endpoint, data)
        .filter(|id| !id.is_empty())
        .ok_or(MediaError::MissingAppendMediaId)?;
    let segment_index = extract_segment_index(&request.endpoint, data)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "0".to_string());

    let path = media_file.as_ref();
    let contents = tokio::fs::read(path)
        .await
        .map_err(|e| MediaError::io(path, e))?;
    let file_name = media_file_name(path);

    let form = MultipartForm::new()
        .text("command", "APPEND")
        .text("media_id", media_id)
        .text("segment_index", segment_index)
        .file("media", file_name, Bytes::from(contents));

    let mut options = request.clone();
    options.data = None;
    if options.method == HttpMethod::Get {
        options.method = HttpMethod::Post;
    }

    Ok(api.send_multipart(&options, form).await?)
}
