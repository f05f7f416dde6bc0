//! Reader for the legacy YAML credential file (`~/.twurlrc`).
//!
//! The file maps usernames to consumer keys to OAuth1 profiles and may carry
//! app bearer tokens:
//!
//! ```yaml
//! profiles:
//!   alice:
//!     CONSUMER_KEY:
//!       username: alice
//!       consumer_key: CONSUMER_KEY
//!       consumer_secret: CONSUMER_SECRET
//!       token: ACCESS_TOKEN
//!       secret: TOKEN_SECRET
//! configuration:
//!   default_profile:
//!   - alice
//!   - CONSUMER_KEY
//! bearer_tokens:
//!   CONSUMER_KEY: BEARER_TOKEN
//! ```
//!
//! Only one OAuth1 profile and one bearer token are taken. The profile named
//! by `configuration.default_profile` wins when it exists; otherwise the
//! lexicographically smallest username and consumer key are used. The bearer
//! token is the one under the smallest key.

use crate::error::{AuthError, Result};
use crate::types::OAuth1Credential;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct LegacyFile {
    #[serde(default)]
    profiles: Option<BTreeMap<String, BTreeMap<String, LegacyProfile>>>,
    #[serde(default)]
    configuration: Option<LegacyConfiguration>,
    #[serde(default)]
    bearer_tokens: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct LegacyProfile {
    #[serde(default)]
    consumer_secret: String,
    #[serde(default)]
    token: String,
    #[serde(default)]
    secret: String,
}

#[derive(Debug, Deserialize)]
struct LegacyConfiguration {
    #[serde(default)]
    default_profile: Vec<String>,
}

/// Credentials recovered from a legacy file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LegacyCredentials {
    pub oauth1: Option<OAuth1Credential>,
    pub bearer: Option<String>,
}

impl LegacyCredentials {
    pub fn is_empty(&self) -> bool {
        self.oauth1.is_none() && self.bearer.is_none()
    }
}

/// Read and parse the legacy file at `path`.
pub fn read_legacy_file(path: &Path) -> Result<LegacyCredentials> {
    let content = std::fs::read_to_string(path).map_err(|e| AuthError::io(path, e))?;
    parse_legacy(&content)
}

/// Parse legacy YAML content.
///
/// # Errors
///
/// Returns [`AuthError::Parse`] when the document is not valid YAML or does
/// not have the expected shape.
pub fn parse_legacy(content: &str) -> Result<LegacyCredentials> {
    if content.trim().is_empty() {
        return Ok(LegacyCredentials::default());
    }

    let file: LegacyFile =
        serde_yaml::from_str(content).map_err(|e| AuthError::parse("legacy credential file", e))?;

    let profiles = file.profiles.unwrap_or_default();
    let default_profile = file
        .configuration
        .map(|c| c.default_profile)
        .unwrap_or_default();

    let preferred = match default_profile.as_slice() {
        [username, consumer_key, ..] => profiles
            .get(username)
            .and_then(|keys| keys.get_key_value(consumer_key)),
        _ => None,
    };

    // BTreeMap iteration is ordered, so "first" is deterministic.
    let chosen = preferred.or_else(|| {
        profiles
            .values()
            .find_map(|keys| keys.iter().next())
    });

    let oauth1 = chosen.map(|(consumer_key, profile)| OAuth1Credential {
        access_token: profile.token.clone(),
        token_secret: profile.secret.clone(),
        consumer_key: consumer_key.clone(),
        consumer_secret: profile.consumer_secret.clone(),
    });

    let bearer = file
        .bearer_tokens
        .unwrap_or_default()
        .into_values()
        .next();

    Ok(LegacyCredentials { oauth1, bearer })
}
