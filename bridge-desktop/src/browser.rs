//! System browser launcher

use bridge_traits::{
    browser::UrlOpener,
    error::{BridgeError, Result},
};
use tracing::debug;

/// Opens URLs with the desktop's default browser.
#[derive(Debug, Default, Clone)]
pub struct SystemBrowser;

impl SystemBrowser {
    pub fn new() -> Self {
        Self
    }
}

impl UrlOpener for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        debug!("Opening URL in system browser");
        webbrowser::open(url)
            .map_err(|e| BridgeError::NotAvailable(format!("Failed to open browser: {}", e)))
    }
}
