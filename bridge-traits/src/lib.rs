//! # Host Bridge Traits
//!
//! Platform abstraction traits that the API client core depends on.
//!
//! ## Overview
//!
//! The core never talks to the network, the clock or the user's browser
//! directly. Each of those capabilities is expressed as a trait here and
//! implemented per host. The desktop implementations live in
//! `bridge-desktop`; tests supply scripted implementations.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP, buffered or streamed
//! - [`UrlOpener`](browser::UrlOpener) - Hand a URL to the user
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type.
//! Implementations convert platform errors into it and keep the message
//! actionable.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so handles can be shared across
//! async tasks behind `Arc`.
//!
//! ## Examples
//!
//! ```ignore
//! use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse, HttpStream};
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//!
//! pub struct MyHttpClient {
//!     client: reqwest::Client,
//! }
//!
//! #[async_trait]
//! impl HttpClient for MyHttpClient {
//!     async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
//!         todo!()
//!     }
//!
//!     async fn execute_stream(&self, request: HttpRequest) -> Result<HttpStream> {
//!         todo!()
//!     }
//! }
//! ```

pub mod browser;
pub mod error;
pub mod http;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use browser::UrlOpener;
pub use http::{
    HttpClient, HttpMethod, HttpRequest, HttpResponse, HttpStream, MultipartFile, MultipartForm,
};
pub use time::{Clock, LogLevel, SystemClock};
