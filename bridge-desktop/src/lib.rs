//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest` (rustls, multipart, streaming)
//! - `UrlOpener` using the `webbrowser` crate
//! - Default credential file locations resolved with `dirs`
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{paths, ReqwestHttpClient, SystemBrowser};
//! use std::sync::Arc;
//!
//! let http_client = Arc::new(ReqwestHttpClient::new()?);
//! let browser = Arc::new(SystemBrowser::new());
//! let store_path = paths::default_token_store_path();
//! ```

mod browser;
mod http;
pub mod paths;

pub use browser::SystemBrowser;
pub use http::ReqwestHttpClient;
