//! # Client Configuration
//!
//! Endpoint URLs, OAuth 2.0 client credentials and file locations used by the
//! authentication and API layers.
//!
//! ## Overview
//!
//! Configuration comes from two places:
//! - [`ClientConfig::from_env`] reads the process environment and fills in
//!   defaults for the public X API endpoints.
//! - [`ClientConfig::builder`] builds a configuration explicitly, which is
//!   what tests and embedding hosts use.
//!
//! Both paths end in [`ClientConfig::validate`].
//!
//! ## Environment
//!
//! | Variable | Default |
//! |----------|---------|
//! | `CLIENT_ID` | empty |
//! | `CLIENT_SECRET` | none |
//! | `REDIRECT_URI` | `http://localhost:8080/callback` |
//! | `AUTH_URL` | `https://x.com/i/oauth2/authorize` |
//! | `TOKEN_URL` | `https://api.x.com/2/oauth2/token` |
//! | `API_BASE_URL` | `https://api.x.com` |
//! | `INFO_URL` | `{API_BASE_URL}/2/users/me` |
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::ClientConfig;
//!
//! let config = ClientConfig::from_env()?;
//! println!("Talking to {}", config.api_base_url);
//! ```

use crate::error::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080/callback";
pub const DEFAULT_AUTH_URL: &str = "https://x.com/i/oauth2/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://api.x.com/2/oauth2/token";
pub const DEFAULT_API_BASE_URL: &str = "https://api.x.com";

/// How long the authorization callback listener waits for the browser.
pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// Default `User-Agent` sent with every API request.
pub fn default_user_agent() -> String {
    format!("xurl/{}", env!("CARGO_PKG_VERSION"))
}

/// Runtime configuration for the API client.
#[derive(Clone)]
pub struct ClientConfig {
    /// OAuth 2.0 client ID. May be empty when only OAuth1 or app auth is used.
    pub client_id: String,
    /// OAuth 2.0 client secret. `None` for public clients.
    pub client_secret: Option<String>,
    /// Redirect URI registered with the app; the callback listener binds to
    /// its host and port.
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub api_base_url: String,
    /// Endpoint used to resolve the username after authorization.
    pub info_url: String,
    /// Token store location. `None` means the host default.
    pub token_store_path: Option<PathBuf>,
    /// Legacy credential file location. `None` means the host default.
    pub legacy_credentials_path: Option<PathBuf>,
    pub callback_timeout: Duration,
    pub user_agent: String,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("redirect_uri", &self.redirect_uri)
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("api_base_url", &self.api_base_url)
            .field("info_url", &self.info_url)
            .field("token_store_path", &self.token_store_path)
            .field("legacy_credentials_path", &self.legacy_credentials_path)
            .field("callback_timeout", &self.callback_timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            info_url: format!("{}/2/users/me", DEFAULT_API_BASE_URL),
            token_store_path: None,
            legacy_credentials_path: None,
            callback_timeout: DEFAULT_CALLBACK_TIMEOUT,
            user_agent: default_user_agent(),
        }
    }
}

impl ClientConfig {
    /// Creates a new builder for constructing a `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let mut builder = ClientConfig::builder();
        if let Some(client_id) = get("CLIENT_ID") {
            builder = builder.client_id(client_id);
        }
        if let Some(secret) = get("CLIENT_SECRET") {
            builder = builder.client_secret(secret);
        }
        if let Some(redirect_uri) = get("REDIRECT_URI") {
            builder = builder.redirect_uri(redirect_uri);
        }
        if let Some(auth_url) = get("AUTH_URL") {
            builder = builder.auth_url(auth_url);
        }
        if let Some(token_url) = get("TOKEN_URL") {
            builder = builder.token_url(token_url);
        }
        if let Some(api_base_url) = get("API_BASE_URL") {
            builder = builder.api_base_url(api_base_url);
        }
        if let Some(info_url) = get("INFO_URL") {
            builder = builder.info_url(info_url);
        }

        builder.build()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when an endpoint is not an absolute URL, the
    /// redirect URI cannot be bound locally, or the callback timeout is zero.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("auth_url", &self.auth_url),
            ("token_url", &self.token_url),
            ("api_base_url", &self.api_base_url),
            ("info_url", &self.info_url),
        ] {
            Url::parse(value)
                .map_err(|e| Error::Config(format!("Invalid {} '{}': {}", name, value, e)))?;
        }

        let redirect = Url::parse(&self.redirect_uri).map_err(|e| {
            Error::Config(format!("Invalid redirect_uri '{}': {}", self.redirect_uri, e))
        })?;
        if redirect.scheme() != "http" {
            return Err(Error::Config(
                "redirect_uri must use http so the local listener can receive the callback"
                    .to_string(),
            ));
        }
        if redirect.host_str().is_none() {
            return Err(Error::Config("redirect_uri must include a host".to_string()));
        }

        if self.callback_timeout.is_zero() {
            return Err(Error::Config(
                "callback_timeout must be greater than zero".to_string(),
            ));
        }

        if self.user_agent.trim().is_empty() {
            return Err(Error::Config("user_agent cannot be empty".to_string()));
        }

        Ok(())
    }

    /// Whether an OAuth 2.0 client is configured.
    pub fn has_oauth2_client(&self) -> bool {
        !self.client_id.is_empty()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Default)]
pub struct ClientConfigBuilder {
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_uri: Option<String>,
    auth_url: Option<String>,
    token_url: Option<String>,
    api_base_url: Option<String>,
    info_url: Option<String>,
    token_store_path: Option<PathBuf>,
    legacy_credentials_path: Option<PathBuf>,
    callback_timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl ClientConfigBuilder {
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    pub fn redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    pub fn auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = Some(url.into());
        self
    }

    pub fn token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = Some(url.into());
        self
    }

    /// Sets the API base URL. Unless [`info_url`](Self::info_url) is also
    /// set, the info URL is derived from it.
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    pub fn info_url(mut self, url: impl Into<String>) -> Self {
        self.info_url = Some(url.into());
        self
    }

    pub fn token_store_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.token_store_path = Some(path.into());
        self
    }

    pub fn legacy_credentials_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.legacy_credentials_path = Some(path.into());
        self
    }

    pub fn callback_timeout(mut self, timeout: Duration) -> Self {
        self.callback_timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Builds and validates the final `ClientConfig`.
    pub fn build(self) -> Result<ClientConfig> {
        let defaults = ClientConfig::default();

        let api_base_url = self
            .api_base_url
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_base_url);
        let info_url = self
            .info_url
            .unwrap_or_else(|| format!("{}/2/users/me", api_base_url));

        let config = ClientConfig {
            client_id: self.client_id.unwrap_or(defaults.client_id),
            client_secret: self.client_secret.filter(|s| !s.is_empty()),
            redirect_uri: self.redirect_uri.unwrap_or(defaults.redirect_uri),
            auth_url: self.auth_url.unwrap_or(defaults.auth_url),
            token_url: self.token_url.unwrap_or(defaults.token_url),
            api_base_url,
            info_url,
            token_store_path: self.token_store_path,
            legacy_credentials_path: self.legacy_credentials_path,
            callback_timeout: self.callback_timeout.unwrap_or(defaults.callback_timeout),
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
        };

        config.validate()?;

        Ok(config)
    }
}
