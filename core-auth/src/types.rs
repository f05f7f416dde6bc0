use crate::error::AuthError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// OAuth 1.0a user-context credential.
///
/// Field names match the persisted token store layout.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth1Credential {
    pub access_token: String,
    pub token_secret: String,
    pub consumer_key: String,
    pub consumer_secret: String,
}

impl OAuth1Credential {
    pub fn new(
        access_token: impl Into<String>,
        token_secret: impl Into<String>,
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            token_secret: token_secret.into(),
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
        }
    }
}

impl fmt::Debug for OAuth1Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth1Credential")
            .field("access_token", &"[REDACTED]")
            .field("token_secret", &"[REDACTED]")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[REDACTED]")
            .finish()
    }
}

/// OAuth 2.0 user-context credential for one account.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2Credential {
    pub access_token: String,
    /// Empty when the provider did not issue one.
    #[serde(default)]
    pub refresh_token: String,
    /// Absolute expiry, Unix seconds.
    pub expiration_time: u64,
}

impl OAuth2Credential {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expiration_time: u64,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expiration_time,
        }
    }

    /// Whether the access token is expired at `now` (Unix seconds).
    pub fn is_expired_at(&self, now: i64) -> bool {
        let now = u64::try_from(now).unwrap_or(0);
        now >= self.expiration_time
    }

    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }
}

impl fmt::Debug for OAuth2Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Credential")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expiration_time", &self.expiration_time)
            .finish()
    }
}

/// Any stored credential.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// App-only bearer token
    Bearer(String),
    OAuth1(OAuth1Credential),
    OAuth2(OAuth2Credential),
}

impl Credential {
    /// Scheme this credential authenticates with.
    pub fn scheme(&self) -> AuthScheme {
        match self {
            Credential::Bearer(_) => AuthScheme::App,
            Credential::OAuth1(_) => AuthScheme::OAuth1,
            Credential::OAuth2(_) => AuthScheme::OAuth2,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Bearer(_) => f.write_str("Bearer([REDACTED])"),
            Credential::OAuth1(cred) => f.debug_tuple("OAuth1").field(cred).finish(),
            Credential::OAuth2(cred) => f.debug_tuple("OAuth2").field(cred).finish(),
        }
    }
}

/// Authentication scheme a caller can request explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthScheme {
    OAuth1,
    OAuth2,
    /// App-only bearer token
    App,
}

impl AuthScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthScheme::OAuth1 => "oauth1",
            AuthScheme::OAuth2 => "oauth2",
            AuthScheme::App => "app",
        }
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthScheme {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "oauth1" => Ok(AuthScheme::OAuth1),
            "oauth2" => Ok(AuthScheme::OAuth2),
            "app" => Ok(AuthScheme::App),
            other => Err(AuthError::InvalidAuthType(other.to_string())),
        }
    }
}
