//! # API Client
//!
//! Authenticated transport for the X API.
//!
//! [`ApiClient`] resolves endpoints against the configured base URL, asks
//! the [`AuthSelector`](core_auth::AuthSelector) for an `Authorization`
//! header and returns JSON. Non-2xx responses become [`ApiError::Api`]
//! with the payload untouched. Streaming endpoints are read line by line
//! through [`LineStream`].

pub mod client;
pub mod endpoints;
pub mod error;
pub mod request;
pub mod stream;

pub use client::{process_response, ApiClient};
pub use endpoints::{is_streaming_endpoint, MEDIA_UPLOAD_ENDPOINT, STREAMING_ENDPOINTS};
pub use error::{ApiError, Result};
pub use request::RequestOptions;
pub use stream::{LineStream, MAX_LINE_LENGTH};
