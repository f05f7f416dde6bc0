//! Workspace umbrella crate.
//!
//! Re-exports the service façade so host binaries can depend on
//! `xapi-workspace` and get the desktop wiring through the default
//! `desktop-shims` feature without naming each workspace crate.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;
