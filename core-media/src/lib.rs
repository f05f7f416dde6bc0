//! # Media Upload
//!
//! Chunked uploads through the X API media endpoint.
//!
//! [`MediaUploader`] runs one upload as a state machine over the INIT,
//! APPEND, FINALIZE and STATUS commands. [`execute_upload`] and
//! [`execute_status`] wrap it for the common command paths, and the
//! `extract_*` helpers support hand-written APPEND requests.
//!
//! ## Example
//!
//! ```ignore
//! use core_media::{execute_upload, UploadOptions};
//!
//! let outcome = execute_upload(api, "clip.mp4", "video/mp4", "tweet_video", true,
//!     UploadOptions::default()).await?;
//! println!("media id: {}", outcome.media_id);
//! ```

pub mod error;
pub mod execute;
pub mod types;
pub mod uploader;

pub use error::{MediaError, Result};
pub use execute::{
    execute_status, execute_upload, extract_media_id, extract_segment_index,
    handle_media_append_request, is_media_append_request, UploadOutcome,
};
pub use types::{ProcessingInfo, ProcessingState, UploadState};
pub use uploader::{MediaUploader, UploadOptions, CHUNK_SIZE};
