//! Browser hand-off used by interactive authorization.

use crate::error::Result;

/// Opens a URL for the user, usually in the system browser.
///
/// Desktop hosts delegate to the OS. Headless hosts can print the URL
/// instead and return `Ok(())`.
pub trait UrlOpener: Send + Sync {
    fn open(&self, url: &str) -> Result<()>;
}
