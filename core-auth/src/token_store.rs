//! Persistent Token Storage
//!
//! Holds every credential the client knows about in a single JSON file
//! (`~/.xurl` on desktop):
//!
//! - any number of OAuth 2.0 accounts, keyed by username
//! - at most one OAuth 1.0a credential
//! - at most one app bearer token
//!
//! ## Persistence
//!
//! The file is the only persisted copy. Every mutation rewrites it in full by
//! writing a sibling temporary file and renaming it over the target, so a
//! crash never leaves a half-written store behind. On Unix the file is
//! created with mode `0600`.
//!
//! ## Legacy import
//!
//! [`TokenStore::load_with_legacy`] fills a missing OAuth1 credential or
//! bearer token from the legacy YAML file once, then persists the result.
//! Import problems at load time are logged and ignored.
//!
//! ## Example
//!
//! ```no_run
//! use core_auth::{OAuth2Credential, TokenStore};
//!
//! # fn example() -> core_auth::Result<()> {
//! let mut store = TokenStore::load("/home/me/.xurl")?;
//! store.save_oauth2("alice", OAuth2Credential::new("at", "rt", 1_700_000_000))?;
//! assert_eq!(store.oauth2_usernames(), vec!["alice".to_string()]);
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::legacy;
use crate::types::{OAuth1Credential, OAuth2Credential};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// On-disk credential record, tagged by `type`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum StoredToken {
    Bearer { bearer: String },
    OAuth1 { oauth1: OAuth1Credential },
    OAuth2 { oauth2: OAuth2Credential },
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    oauth2_tokens: Option<BTreeMap<String, StoredToken>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    oauth1_tokens: Option<StoredToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bearer_token: Option<StoredToken>,
    #[serde(default)]
    file_path: String,
}

/// File-backed credential store.
#[derive(Clone)]
pub struct TokenStore {
    path: PathBuf,
    oauth2: BTreeMap<String, OAuth2Credential>,
    oauth1: Option<OAuth1Credential>,
    bearer: Option<String>,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("path", &self.path)
            .field("oauth2_accounts", &self.oauth2.keys().collect::<Vec<_>>())
            .field("has_oauth1", &self.oauth1.is_some())
            .field("has_bearer", &self.bearer.is_some())
            .finish()
    }
}

impl TokenStore {
    /// An empty store that will persist to `path` on first mutation.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            oauth2: BTreeMap::new(),
            oauth1: None,
            bearer: None,
        }
    }

    /// Load the store at `path`. A missing file yields an empty store.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Io`] if the file exists but cannot be read
    /// - [`AuthError::Parse`] if the file is not a valid token store
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut store = Self::empty(path.clone());

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Token store not found, starting empty");
                return Ok(store);
            }
            Err(e) => return Err(AuthError::io(&path, e)),
        };

        if content.trim().is_empty() {
            return Ok(store);
        }

        let file: StoreFile =
            serde_json::from_str(&content).map_err(|e| AuthError::parse("token store", e))?;

        for (username, token) in file.oauth2_tokens.unwrap_or_default() {
            match token {
                StoredToken::OAuth2 { oauth2 } => {
                    store.oauth2.insert(username, oauth2);
                }
                _ => {
                    return Err(AuthError::parse(
                        "token store",
                        format!("entry for '{}' is not an oauth2 token", username),
                    ))
                }
            }
        }

        store.oauth1 = match file.oauth1_tokens {
            None => None,
            Some(StoredToken::OAuth1 { oauth1 }) => Some(oauth1),
            Some(_) => {
                return Err(AuthError::parse(
                    "token store",
                    "oauth1_tokens is not an oauth1 token",
                ))
            }
        };

        store.bearer = match file.bearer_token {
            None => None,
            Some(StoredToken::Bearer { bearer }) => Some(bearer),
            Some(_) => {
                return Err(AuthError::parse(
                    "token store",
                    "bearer_token is not a bearer token",
                ))
            }
        };

        debug!(
            path = %store.path.display(),
            oauth2_accounts = store.oauth2.len(),
            has_oauth1 = store.oauth1.is_some(),
            has_bearer = store.bearer.is_some(),
            "Token store loaded"
        );

        Ok(store)
    }

    /// Load the store and import from the legacy file when the OAuth1 or
    /// bearer slot is empty.
    ///
    /// Only a malformed primary store is an error; legacy problems are
    /// logged and the store is returned as loaded.
    pub fn load_with_legacy(path: impl Into<PathBuf>, legacy_path: &Path) -> Result<Self> {
        let mut store = Self::load(path)?;

        if (store.oauth1.is_none() || store.bearer.is_none()) && legacy_path.exists() {
            if let Err(e) = store.import_legacy(legacy_path) {
                warn!(
                    path = %legacy_path.display(),
                    error = %e,
                    "Skipping legacy credential import"
                );
            }
        }

        Ok(store)
    }

    /// Fill empty OAuth1 and bearer slots from the legacy file at `path`.
    ///
    /// Returns whether anything was imported. Existing credentials are never
    /// overwritten, and the store is untouched if the file cannot be parsed.
    pub fn import_legacy(&mut self, path: &Path) -> Result<bool> {
        let imported = legacy::read_legacy_file(path)?;

        let mut changed = false;
        if self.oauth1.is_none() {
            if let Some(oauth1) = imported.oauth1 {
                self.oauth1 = Some(oauth1);
                changed = true;
            }
        }
        if self.bearer.is_none() {
            if let Some(bearer) = imported.bearer {
                self.bearer = Some(bearer);
                changed = true;
            }
        }

        if changed {
            self.persist()?;
            info!(
                has_oauth1 = self.oauth1.is_some(),
                has_bearer = self.bearer.is_some(),
                "Imported credentials from legacy file"
            );
        }

        Ok(changed)
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the app bearer token.
    pub fn save_bearer(&mut self, token: impl Into<String>) -> Result<()> {
        self.bearer = Some(token.into());
        self.persist()
    }

    /// Replace the OAuth1 credential.
    pub fn save_oauth1(&mut self, credential: OAuth1Credential) -> Result<()> {
        self.oauth1 = Some(credential);
        self.persist()
    }

    /// Insert or replace the OAuth2 credential for `username`.
    pub fn save_oauth2(
        &mut self,
        username: impl Into<String>,
        credential: OAuth2Credential,
    ) -> Result<()> {
        self.oauth2.insert(username.into(), credential);
        self.persist()
    }

    pub fn bearer(&self) -> Option<&str> {
        self.bearer.as_deref()
    }

    pub fn oauth1(&self) -> Option<&OAuth1Credential> {
        self.oauth1.as_ref()
    }

    pub fn oauth2(&self, username: &str) -> Option<&OAuth2Credential> {
        self.oauth2.get(username)
    }

    /// The account with the smallest username, if any.
    pub fn first_oauth2(&self) -> Option<(&str, &OAuth2Credential)> {
        self.oauth2
            .iter()
            .next()
            .map(|(username, credential)| (username.as_str(), credential))
    }

    pub fn oauth2_usernames(&self) -> Vec<String> {
        self.oauth2.keys().cloned().collect()
    }

    pub fn has_oauth1(&self) -> bool {
        self.oauth1.is_some()
    }

    pub fn has_bearer(&self) -> bool {
        self.bearer.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.oauth2.is_empty() && self.oauth1.is_none() && self.bearer.is_none()
    }

    /// Remove the OAuth2 account for `username`. Other accounts are kept.
    pub fn clear_oauth2(&mut self, username: &str) -> Result<()> {
        if self.oauth2.remove(username).is_none() {
            debug!(username, "No OAuth2 account to clear");
        }
        self.persist()
    }

    pub fn clear_oauth1(&mut self) -> Result<()> {
        self.oauth1 = None;
        self.persist()
    }

    pub fn clear_bearer(&mut self) -> Result<()> {
        self.bearer = None;
        self.persist()
    }

    /// Remove every credential.
    pub fn clear_all(&mut self) -> Result<()> {
        self.oauth2.clear();
        self.oauth1 = None;
        self.bearer = None;
        self.persist()
    }

    fn to_file(&self) -> StoreFile {
        StoreFile {
            oauth2_tokens: Some(
                self.oauth2
                    .iter()
                    .map(|(username, credential)| {
                        (
                            username.clone(),
                            StoredToken::OAuth2 {
                                oauth2: credential.clone(),
                            },
                        )
                    })
                    .collect(),
            ),
            oauth1_tokens: self.oauth1.clone().map(|oauth1| StoredToken::OAuth1 { oauth1 }),
            bearer_token: self.bearer.clone().map(|bearer| StoredToken::Bearer { bearer }),
            file_path: self.path.to_string_lossy().into_owned(),
        }
    }

    /// Write the whole store to disk atomically.
    fn persist(&self) -> Result<()> {
        let json = serde_json::to_vec_pretty(&self.to_file())
            .map_err(|e| AuthError::parse("token store serialization", e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| AuthError::io(parent, e))?;
        }

        let tmp_path = self.temp_path();
        let result = write_owner_only(&tmp_path, &json)
            .and_then(|_| fs::rename(&tmp_path, &self.path));

        if let Err(e) = result {
            let _ = fs::remove_file(&tmp_path);
            return Err(AuthError::io(&self.path, e));
        }

        debug!(path = %self.path.display(), "Token store saved");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "tokens".to_string());
        self.path
            .with_file_name(format!(".{}.tmp-{}", file_name, std::process::id()))
    }
}

#[cfg(unix)]
fn write_owner_only(path: &Path, data: &[u8]) -> std::io::Result<()> {
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(data)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_owner_only(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(data)?;
    file.sync_all()
}
