//! # Core Runtime Module
//!
//! Foundational runtime pieces shared by the client crates:
//! - Logging and tracing setup
//! - Client configuration (environment, builder, validation)
//!
//! ## Overview
//!
//! Nothing in here performs network or disk I/O. Other crates take a
//! [`ClientConfig`](config::ClientConfig) and emit `tracing` events that the
//! subscriber installed by [`init_logging`](logging::init_logging) renders.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{Error, Result};
