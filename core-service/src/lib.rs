//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP, browser,
//! clock) and the client configuration into one [`CoreService`]. Desktop
//! hosts enable the `desktop-shims` feature, which depends on
//! `bridge-desktop` and provides [`CoreService::bootstrap`].

pub mod error;

pub use error::{CoreError, ErrorKind, Result};

use std::path::Path;
use std::sync::Arc;

use bridge_traits::{browser::UrlOpener, http::HttpClient, time::Clock};
use core_api::{is_streaming_endpoint, ApiClient, LineStream, RequestOptions};
use core_auth::{
    AuthSelector, OAuth1Credential, OAuthConfig, OAuthFlowManager, TokenStore,
};
use core_media::{
    execute_status, execute_upload, handle_media_append_request, is_media_append_request,
    UploadOptions, UploadOutcome,
};
use core_runtime::config::ClientConfig;
use core_runtime::logging::mask_secret;
use serde_json::Value;
use tracing::info;

/// Aggregated handle to all bridge dependencies the core requires.
pub struct CoreDependencies {
    pub http_client: Arc<dyn HttpClient>,
    pub url_opener: Arc<dyn UrlOpener>,
    pub clock: Arc<dyn Clock>,
}

impl CoreDependencies {
    /// Construct a dependency bundle from explicit bridge handles.
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        url_opener: Arc<dyn UrlOpener>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            http_client,
            url_opener,
            clock,
        }
    }
}

/// Outcome of [`CoreService::execute`].
#[derive(Debug)]
pub enum RequestOutcome {
    Json(Value),
    Stream(LineStream),
}

/// Credentials that can be removed with [`CoreService::clear_auth`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearTarget {
    All,
    OAuth1,
    OAuth2(String),
    Bearer,
}

/// Snapshot of stored credentials with secrets masked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthStatus {
    pub oauth2_accounts: Vec<String>,
    /// Masked OAuth1 consumer key
    pub oauth1_consumer_key: Option<String>,
    /// Masked app bearer token
    pub bearer_token: Option<String>,
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    config: Arc<ClientConfig>,
    selector: Arc<AuthSelector>,
    api: Arc<ApiClient>,
}

impl CoreService {
    /// Create a service from explicit dependencies.
    ///
    /// Loads the token store and imports legacy credentials when the
    /// configuration names a legacy file.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InitializationFailed`] without a token store path
    /// - [`CoreError::Auth`] if the token store is malformed
    pub fn new(config: ClientConfig, deps: CoreDependencies) -> Result<Self> {
        config.validate()?;

        let store_path = config.token_store_path.clone().ok_or_else(|| {
            CoreError::InitializationFailed("token_store_path is not configured".to_string())
        })?;
        let store = match config.legacy_credentials_path.as_deref() {
            Some(legacy) => TokenStore::load_with_legacy(store_path, legacy)?,
            None => TokenStore::load(store_path)?,
        };

        let flow = OAuthFlowManager::new(
            OAuthConfig::from_client_config(&config),
            deps.http_client.clone(),
            deps.clock,
        );
        let selector = Arc::new(AuthSelector::new(
            store,
            Arc::new(flow),
            deps.url_opener,
            config.callback_timeout,
        ));
        let api = Arc::new(ApiClient::new(
            deps.http_client,
            selector.clone(),
            &config,
        ));

        Ok(Self {
            config: Arc::new(config),
            selector,
            api,
        })
    }

    /// Build a service with the desktop bridges and default file locations.
    #[cfg(feature = "desktop-shims")]
    pub fn bootstrap(mut config: ClientConfig) -> Result<Self> {
        use bridge_desktop::{paths, ReqwestHttpClient, SystemBrowser};
        use bridge_traits::time::SystemClock;

        if config.token_store_path.is_none() {
            config.token_store_path = Some(paths::default_token_store_path());
        }
        if config.legacy_credentials_path.is_none() {
            config.legacy_credentials_path = Some(paths::default_legacy_credentials_path());
        }

        let http_client = ReqwestHttpClient::new()
            .map_err(|e| CoreError::InitializationFailed(e.to_string()))?;

        Self::new(
            config,
            CoreDependencies::new(
                Arc::new(http_client),
                Arc::new(SystemBrowser::new()),
                Arc::new(SystemClock),
            ),
        )
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn api(&self) -> Arc<ApiClient> {
        Arc::clone(&self.api)
    }

    pub fn selector(&self) -> Arc<AuthSelector> {
        Arc::clone(&self.selector)
    }

    /// Send a request, streaming it when the endpoint is a known stream or
    /// `force_stream` is set. A `media_file` turns an APPEND command into a
    /// multipart upload.
    pub async fn execute(
        &self,
        options: &RequestOptions,
        media_file: Option<&str>,
        force_stream: bool,
    ) -> Result<RequestOutcome> {
        if is_media_append_request(&options.endpoint, media_file) {
            if let Some(file) = media_file {
                let value = handle_media_append_request(&self.api, options, file).await?;
                return Ok(RequestOutcome::Json(value));
            }
        }

        if force_stream || is_streaming_endpoint(&options.endpoint) {
            return Ok(RequestOutcome::Stream(self.api.stream(options).await?));
        }

        Ok(RequestOutcome::Json(self.api.send(options).await?))
    }

    /// Upload a file; see [`core_media::execute_upload`].
    pub async fn upload_media(
        &self,
        path: impl AsRef<Path>,
        media_type: &str,
        media_category: &str,
        wait: bool,
        options: UploadOptions,
    ) -> Result<UploadOutcome> {
        Ok(execute_upload(
            self.api(),
            path,
            media_type,
            media_category,
            wait,
            options,
        )
        .await?)
    }

    pub async fn media_status(
        &self,
        media_id: &str,
        wait: bool,
        options: UploadOptions,
    ) -> Result<Value> {
        Ok(execute_status(self.api(), media_id, wait, options).await?)
    }

    /// Run the interactive OAuth2 authorization. Returns the username.
    pub async fn authorize_oauth2(&self) -> Result<String> {
        let (username, _) = self.selector.authorize().await?;
        Ok(username)
    }

    pub async fn save_oauth1(&self, credential: OAuth1Credential) -> Result<()> {
        self.selector.store().lock().await.save_oauth1(credential)?;
        info!("OAuth1 credential saved");
        Ok(())
    }

    pub async fn save_app_bearer(&self, token: &str) -> Result<()> {
        self.selector.store().lock().await.save_bearer(token)?;
        info!("App bearer token saved");
        Ok(())
    }

    pub async fn auth_status(&self) -> AuthStatus {
        let store = self.selector.store().lock().await;
        AuthStatus {
            oauth2_accounts: store.oauth2_usernames(),
            oauth1_consumer_key: store.oauth1().map(|c| mask_secret(&c.consumer_key)),
            bearer_token: store.bearer().map(mask_secret),
        }
    }

    pub async fn clear_auth(&self, target: ClearTarget) -> Result<()> {
        let mut store = self.selector.store().lock().await;
        match &target {
            ClearTarget::All => store.clear_all()?,
            ClearTarget::OAuth1 => store.clear_oauth1()?,
            ClearTarget::OAuth2(username) => store.clear_oauth2(username)?,
            ClearTarget::Bearer => store.clear_bearer()?,
        }
        info!(?target, "Credentials cleared");
        Ok(())
    }
}
