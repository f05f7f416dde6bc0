//! Default on-disk locations for credential files.

use std::path::PathBuf;

/// File name of the token store in the user's home directory.
pub const TOKEN_STORE_FILE: &str = ".xurl";

/// File name of the legacy YAML credential file.
pub const LEGACY_CREDENTIALS_FILE: &str = ".twurlrc";

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// `~/.xurl`, or `./.xurl` when no home directory can be determined.
pub fn default_token_store_path() -> PathBuf {
    home_dir().join(TOKEN_STORE_FILE)
}

/// `~/.twurlrc`, or `./.twurlrc` when no home directory can be determined.
pub fn default_legacy_credentials_path() -> PathBuf {
    home_dir().join(LEGACY_CREDENTIALS_FILE)
}
