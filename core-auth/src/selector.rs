//! Authorization header selection.
//!
//! [`AuthSelector`] owns the [`TokenStore`] and turns a request plus an
//! optional explicit [`AuthScheme`] into an `Authorization` header value.
//!
//! With an explicit scheme the matching credential is used and its errors
//! are returned as-is. Without one the selector tries OAuth2, then OAuth1,
//! then the app bearer token, and reports
//! [`AuthError::NoCredential`] only when all three are unusable.

use crate::error::{AuthError, Result};
use crate::listener::CallbackListener;
use crate::oauth::OAuthFlowManager;
use crate::oauth1::OAuth1Signer;
use crate::refresher::TokenRefresher;
use crate::token_store::TokenStore;
use crate::types::AuthScheme;
use bridge_traits::browser::UrlOpener;
use bridge_traits::http::HttpMethod;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

pub struct AuthSelector {
    store: Mutex<TokenStore>,
    flow: Arc<OAuthFlowManager>,
    refresher: TokenRefresher,
    opener: Arc<dyn UrlOpener>,
    callback_timeout: Duration,
}

impl AuthSelector {
    pub fn new(
        store: TokenStore,
        flow: Arc<OAuthFlowManager>,
        opener: Arc<dyn UrlOpener>,
        callback_timeout: Duration,
    ) -> Self {
        Self {
            store: Mutex::new(store),
            refresher: TokenRefresher::new(flow.clone()),
            flow,
            opener,
            callback_timeout,
        }
    }

    /// Shared access to the underlying store.
    pub fn store(&self) -> &Mutex<TokenStore> {
        &self.store
    }

    /// Produce the `Authorization` header for a request.
    ///
    /// `username` selects an OAuth2 account; without it the first stored
    /// account is used.
    #[instrument(skip(self, url))]
    pub async fn header_for(
        &self,
        method: HttpMethod,
        url: &str,
        scheme: Option<AuthScheme>,
        username: Option<&str>,
    ) -> Result<String> {
        match scheme {
            Some(AuthScheme::OAuth1) => self.oauth1_header(method, url, &[]).await,
            Some(AuthScheme::OAuth2) => self.oauth2_header(username).await,
            Some(AuthScheme::App) => self.bearer_header().await,
            None => self.fallback_header(method, url, username).await,
        }
    }

    async fn fallback_header(
        &self,
        method: HttpMethod,
        url: &str,
        username: Option<&str>,
    ) -> Result<String> {
        match self.oauth2_token(username, false).await {
            Ok(token) => return Ok(format!("Bearer {}", token)),
            Err(e) => debug!(error = %e, "OAuth2 unavailable, trying OAuth1"),
        }

        match self.oauth1_header(method, url, &[]).await {
            Ok(header) => return Ok(header),
            Err(e) => debug!(error = %e, "OAuth1 unavailable, trying app bearer"),
        }

        match self.bearer_header().await {
            Ok(header) => Ok(header),
            Err(e) => {
                debug!(error = %e, "App bearer unavailable");
                Err(AuthError::NoCredential)
            }
        }
    }

    /// `Bearer <token>` from the stored app bearer token.
    pub async fn bearer_header(&self) -> Result<String> {
        let store = self.store.lock().await;
        store
            .bearer()
            .map(|token| format!("Bearer {}", token))
            .ok_or_else(|| AuthError::CredentialNotFound("app bearer token".to_string()))
    }

    /// OAuth1 header signed over `url` and any form body parameters.
    pub async fn oauth1_header(
        &self,
        method: HttpMethod,
        url: &str,
        body_params: &[(String, String)],
    ) -> Result<String> {
        let credential = {
            let store = self.store.lock().await;
            store
                .oauth1()
                .cloned()
                .ok_or_else(|| AuthError::CredentialNotFound("oauth1 credential".to_string()))?
        };
        OAuth1Signer::sign(method, url, body_params, &credential)
    }

    /// `Bearer <token>` for an OAuth2 account, refreshing it if expired.
    ///
    /// Runs the interactive authorization when the account does not exist.
    pub async fn oauth2_header(&self, username: Option<&str>) -> Result<String> {
        let token = self.oauth2_token(username, true).await?;
        Ok(format!("Bearer {}", token))
    }

    async fn oauth2_token(&self, username: Option<&str>, interactive: bool) -> Result<String> {
        {
            let mut store = self.store.lock().await;

            let found = match username {
                Some(name) => store.oauth2(name).map(|c| (name.to_string(), c.clone())),
                None => store
                    .first_oauth2()
                    .map(|(name, c)| (name.to_string(), c.clone())),
            };

            if let Some((name, credential)) = found {
                let now = self.flow.clock().unix_timestamp();
                if !credential.is_expired_at(now) {
                    return Ok(credential.access_token);
                }
                debug!(username = %name, "OAuth2 token expired, refreshing");
                return self.refresher.refresh(&mut store, &name).await;
            }
        }

        if !interactive {
            return Err(AuthError::CredentialNotFound(match username {
                Some(name) => format!("oauth2 account '{}'", name),
                None => "oauth2 account".to_string(),
            }));
        }

        let (_, token) = self.authorize().await?;
        Ok(token)
    }

    /// Run the interactive PKCE authorization and store the new account.
    ///
    /// Returns the username and the new access token.
    #[instrument(skip(self))]
    pub async fn authorize(&self) -> Result<(String, String)> {
        let (auth_url, verifier) = self.flow.build_auth_url()?;

        let listener = CallbackListener::bind(&self.flow.config().redirect_uri).await?;

        if let Err(e) = self.opener.open(&auth_url) {
            warn!(error = %e, "Could not open browser");
            warn!(url = %auth_url, "Open this URL to authorize");
        }

        info!(
            timeout_secs = self.callback_timeout.as_secs(),
            "Waiting for OAuth callback"
        );
        let callback = listener.wait(self.callback_timeout).await?;

        let grant = self
            .flow
            .exchange_code(&callback.code, &callback.state, &verifier)
            .await?;
        let username = self.flow.fetch_username(&grant.access_token).await?;

        let now = self.flow.clock().unix_timestamp();
        let credential = grant.into_credential(now, None);
        let access_token = credential.access_token.clone();

        self.store
            .lock()
            .await
            .save_oauth2(username.clone(), credential)?;

        info!(username = %username, "OAuth2 account authorized");
        Ok((username, access_token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::OAuthConfig;
    use crate::types::{OAuth1Credential, OAuth2Credential};
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse, HttpStream};
    use bridge_traits::time::Clock;
    use bytes::Bytes;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::HashMap;
    use tempfile::TempDir;

    struct FixedClock(i64);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            Utc.timestamp_opt(self.0, 0).single().unwrap()
        }
    }

    struct RefreshOnly;

    #[async_trait]
    impl HttpClient for RefreshOnly {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            Ok(HttpResponse {
                status: 200,
                headers: HashMap::new(),
                body: Bytes::from_static(br#"{"access_token":"refreshed","expires_in":100}"#),
            })
        }

        async fn execute_stream(&self, _request: HttpRequest) -> BridgeResult<HttpStream> {
            Err(BridgeError::NotAvailable("stream".into()))
        }
    }

    struct NoBrowser;

    impl UrlOpener for NoBrowser {
        fn open(&self, _url: &str) -> BridgeResult<()> {
            Err(BridgeError::NotAvailable("browser".into()))
        }
    }

    fn selector(store: TokenStore) -> AuthSelector {
        let config = OAuthConfig {
            client_id: "cid".to_string(),
            client_secret: None,
            redirect_uri: "http://127.0.0.1:0/callback".to_string(),
            scopes: vec![],
            auth_url: "https://x.com/i/oauth2/authorize".to_string(),
            token_url: "https://api.x.com/2/oauth2/token".to_string(),
            info_url: "https://api.x.com/2/users/me".to_string(),
        };
        let flow = OAuthFlowManager::new(config, Arc::new(RefreshOnly), Arc::new(FixedClock(500)));
        AuthSelector::new(
            store,
            Arc::new(flow),
            Arc::new(NoBrowser),
            Duration::from_millis(50),
        )
    }

    fn store(dir: &TempDir) -> TokenStore {
        TokenStore::empty(dir.path().join(".xurl"))
    }

    const URL: &str = "https://api.x.com/2/users/me";

    #[tokio::test]
    async fn test_fallback_prefers_oauth2() {
        let dir = TempDir::new().unwrap();
        let mut s = store(&dir);
        s.save_bearer("app").unwrap();
        s.save_oauth1(OAuth1Credential::new("t", "s", "ck", "cs")).unwrap();
        s.save_oauth2("alice", OAuth2Credential::new("live", "rt", 1_000))
            .unwrap();

        let header = selector(s)
            .header_for(HttpMethod::Get, URL, None, None)
            .await
            .unwrap();
        assert_eq!(header, "Bearer live");
    }

    #[tokio::test]
    async fn test_fallback_to_oauth1_then_bearer() {
        let dir = TempDir::new().unwrap();
        let mut s = store(&dir);
        s.save_bearer("app").unwrap();
        s.save_oauth1(OAuth1Credential::new("t", "s", "ck", "cs")).unwrap();

        let selector = selector(s);
        let header = selector
            .header_for(HttpMethod::Get, URL, None, None)
            .await
            .unwrap();
        assert!(header.starts_with("OAuth oauth_consumer_key=\"ck\""));

        selector.store().lock().await.clear_oauth1().unwrap();
        let header = selector
            .header_for(HttpMethod::Get, URL, None, None)
            .await
            .unwrap();
        assert_eq!(header, "Bearer app");
    }

    #[tokio::test]
    async fn test_empty_store_has_no_credential() {
        let dir = TempDir::new().unwrap();
        let result = selector(store(&dir))
            .header_for(HttpMethod::Get, URL, None, None)
            .await;
        assert!(matches!(result, Err(AuthError::NoCredential)));
    }

    #[tokio::test]
    async fn test_explicit_scheme_errors_propagate() {
        let dir = TempDir::new().unwrap();
        let mut s = store(&dir);
        s.save_bearer("app").unwrap();
        let selector = selector(s);

        let result = selector
            .header_for(HttpMethod::Get, URL, Some(AuthScheme::OAuth1), None)
            .await;
        assert!(matches!(result, Err(AuthError::CredentialNotFound(_))));

        let header = selector
            .header_for(HttpMethod::Get, URL, Some(AuthScheme::App), None)
            .await
            .unwrap();
        assert_eq!(header, "Bearer app");
    }

    #[tokio::test]
    async fn test_named_account_and_expired_refresh() {
        let dir = TempDir::new().unwrap();
        let mut s = store(&dir);
        s.save_oauth2("alice", OAuth2Credential::new("a-live", "rt", 1_000))
            .unwrap();
        s.save_oauth2("bob", OAuth2Credential::new("b-old", "rt-b", 100))
            .unwrap();
        let selector = selector(s);

        let header = selector
            .header_for(HttpMethod::Get, URL, Some(AuthScheme::OAuth2), Some("bob"))
            .await
            .unwrap();
        assert_eq!(header, "Bearer refreshed");

        let store = selector.store().lock().await;
        assert_eq!(
            store.oauth2("bob"),
            Some(&OAuth2Credential::new("refreshed", "rt-b", 600))
        );
        assert_eq!(store.oauth2("alice").unwrap().access_token, "a-live");
    }

    #[tokio::test]
    async fn test_explicit_oauth2_without_account_runs_authorization() {
        let dir = TempDir::new().unwrap();
        let result = selector(store(&dir))
            .header_for(HttpMethod::Get, URL, Some(AuthScheme::OAuth2), None)
            .await;
        // Nobody answers the callback, so the bounded wait expires.
        assert!(matches!(result, Err(AuthError::OperationTimeout { .. })));
    }
}
