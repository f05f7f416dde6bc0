//! OAuth 2.0 Authorization Code Flow with PKCE
//!
//! Implements RFC 6749 (OAuth 2.0) and RFC 7636 (PKCE) against the X API
//! authorization server.
//!
//! # Overview
//!
//! The flow manager handles:
//! - Building the authorization URL with a PKCE challenge and CSRF state
//! - Exchanging the authorization code for tokens
//! - Refreshing access tokens
//! - Resolving the username that owns a fresh token
//!
//! Running the local callback listener and opening the browser is the job
//! of [`AuthSelector::authorize`](crate::selector::AuthSelector::authorize).
//!
//! # Security
//!
//! - The verifier is 32 random bytes, base64url-encoded without padding
//! - The returned state is checked before any code exchange
//! - Tokens, codes and verifiers are never logged

use crate::error::{AuthError, Result};
use crate::types::OAuth2Credential;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::time::Clock;
use bytes::Bytes;
use core_runtime::config::ClientConfig;
use rand::Rng;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

const READ_SCOPES: &[&str] = &[
    "block.read",
    "bookmark.read",
    "dm.read",
    "follows.read",
    "like.read",
    "list.read",
    "mute.read",
    "space.read",
    "tweet.read",
    "timeline.read",
    "users.read",
];

const WRITE_SCOPES: &[&str] = &[
    "block.write",
    "bookmark.write",
    "dm.write",
    "follows.write",
    "like.write",
    "list.write",
    "mute.write",
    "tweet.write",
    "tweet.moderate.write",
    "timeline.write",
    "media.write",
];

const OTHER_SCOPES: &[&str] = &["offline.access"];

/// Scopes requested on every authorization.
pub fn default_scopes() -> Vec<String> {
    READ_SCOPES
        .iter()
        .chain(WRITE_SCOPES)
        .chain(OTHER_SCOPES)
        .map(|s| s.to_string())
        .collect()
}

/// OAuth 2.0 client configuration.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret (optional for public clients)
    pub client_secret: Option<String>,
    /// Redirect URI for OAuth callback
    pub redirect_uri: String,
    /// List of OAuth scopes to request
    pub scopes: Vec<String>,
    /// Authorization endpoint URL
    pub auth_url: String,
    /// Token endpoint URL
    pub token_url: String,
    /// Endpoint returning the authenticated user
    pub info_url: String,
}

impl OAuthConfig {
    pub fn from_client_config(config: &ClientConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scopes: default_scopes(),
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            info_url: config.info_url.clone(),
        }
    }
}

/// PKCE (Proof Key for Code Exchange) verifier.
///
/// Holds the code verifier and the CSRF state for one authorization attempt.
/// Only the challenge derived from the verifier leaves the process before
/// the code exchange.
#[derive(Clone)]
pub struct PkceVerifier {
    verifier: String,
    state: String,
}

impl std::fmt::Debug for PkceVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceVerifier")
            .field("verifier", &"[REDACTED]")
            .field("state", &self.state)
            .finish()
    }
}

impl PkceVerifier {
    /// Create a new PKCE verifier with cryptographically secure random values.
    ///
    /// Generates a 32-byte code verifier (43 characters once encoded) and a
    /// 16-byte state, both URL-safe base64 without padding.
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();

        let mut verifier_bytes = [0u8; 32];
        rng.fill(&mut verifier_bytes);
        let verifier = URL_SAFE_NO_PAD.encode(verifier_bytes);

        let mut state_bytes = [0u8; 16];
        rng.fill(&mut state_bytes);
        let state = URL_SAFE_NO_PAD.encode(state_bytes);

        Self { verifier, state }
    }

    /// Get the code verifier string.
    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    /// Get the state parameter.
    pub fn state(&self) -> &str {
        &self.state
    }

    /// Compute the code challenge from the verifier.
    ///
    /// Uses S256 method: BASE64URL(SHA256(code_verifier))
    pub fn challenge(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.verifier.as_bytes());
        let hash = hasher.finalize();
        URL_SAFE_NO_PAD.encode(hash)
    }
}

impl Default for PkceVerifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Tokens returned by the token endpoint.
#[derive(Clone)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: u64,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"[REDACTED]")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

impl TokenGrant {
    /// Convert into a stored credential issued at `now` (Unix seconds).
    ///
    /// `previous_refresh` is kept when the server did not rotate the refresh
    /// token.
    pub fn into_credential(self, now: i64, previous_refresh: Option<&str>) -> OAuth2Credential {
        let now = u64::try_from(now).unwrap_or(0);
        let refresh_token = self
            .refresh_token
            .filter(|t| !t.is_empty())
            .or_else(|| previous_refresh.map(str::to_string))
            .unwrap_or_default();

        OAuth2Credential {
            access_token: self.access_token,
            refresh_token,
            expiration_time: now.saturating_add(self.expires_in),
        }
    }
}

/// OAuth 2.0 flow manager.
pub struct OAuthFlowManager {
    config: OAuthConfig,
    http_client: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
}

impl OAuthFlowManager {
    pub fn new(
        config: OAuthConfig,
        http_client: Arc<dyn HttpClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            http_client,
            clock,
        }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn require_client_id(&self) -> Result<()> {
        if self.config.client_id.is_empty() {
            return Err(AuthError::MissingConfig(
                "CLIENT_ID is required for OAuth 2.0".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the authorization URL with PKCE challenge.
    ///
    /// Returns both the URL and the PKCE verifier, which must be kept for
    /// the code exchange.
    #[instrument(skip(self))]
    pub fn build_auth_url(&self) -> Result<(String, PkceVerifier)> {
        self.require_client_id()?;

        let verifier = PkceVerifier::new();
        let challenge = verifier.challenge();

        let mut url = Url::parse(&self.config.auth_url)
            .map_err(|e| AuthError::InvalidUrl(format!("Invalid auth URL: {}", e)))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("client_id", &self.config.client_id);
            query.append_pair("redirect_uri", &self.config.redirect_uri);
            query.append_pair("response_type", "code");
            query.append_pair("scope", &self.config.scopes.join(" "));
            query.append_pair("state", verifier.state());
            query.append_pair("code_challenge", &challenge);
            query.append_pair("code_challenge_method", "S256");
        }

        debug!(scopes = self.config.scopes.len(), "Built authorization URL");

        Ok((url.to_string(), verifier))
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// - [`AuthError::StateMismatch`] if `state` differs from the verifier's
    ///   state; no request is sent in that case
    /// - [`AuthError::TokenExchangeFailed`] if the token endpoint rejects
    ///   the code, carrying the response body verbatim
    #[instrument(skip(self, code, state, verifier))]
    pub async fn exchange_code(
        &self,
        code: &str,
        state: &str,
        verifier: &PkceVerifier,
    ) -> Result<TokenGrant> {
        if state != verifier.state() {
            warn!("OAuth state mismatch on authorization callback");
            return Err(AuthError::StateMismatch {
                expected: verifier.state().to_string(),
                actual: state.to_string(),
            });
        }

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code_verifier", verifier.verifier()),
            ("client_id", self.config.client_id.as_str()),
        ];

        debug!("Exchanging authorization code for tokens");

        let response = self.post_token_request(&params).await?;

        if !response.is_success() {
            let error_body = response
                .text()
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            warn!(
                status = response.status,
                "Token endpoint rejected authorization code"
            );

            return Err(AuthError::TokenExchangeFailed(format!(
                "Token endpoint returned {}: {}",
                response.status, error_body
            )));
        }

        let grant = parse_token_response(&response)?;
        info!(expires_in = grant.expires_in, "Exchanged code for tokens");
        Ok(grant)
    }

    /// Exchange a refresh token for a new access token. Single attempt.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenGrant> {
        self.require_client_id()?;

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
        ];

        debug!("Refreshing access token");

        let response = self.post_token_request(&params).await.map_err(|e| match e {
            AuthError::NetworkError(msg) => AuthError::TokenRefreshFailed(msg),
            other => other,
        })?;

        if !response.is_success() {
            let error_body = response
                .text()
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            warn!(status = response.status, "Token refresh rejected");

            return Err(AuthError::TokenRefreshFailed(format!(
                "Token endpoint returned {}: {}",
                response.status, error_body
            )));
        }

        let grant = parse_token_response(&response)?;
        info!(expires_in = grant.expires_in, "Refreshed access token");
        Ok(grant)
    }

    /// Resolve the username that owns `access_token`.
    #[instrument(skip(self, access_token))]
    pub async fn fetch_username(&self, access_token: &str) -> Result<String> {
        let request = HttpRequest::new(HttpMethod::Get, self.config.info_url.clone())
            .bearer_token(access_token);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| AuthError::NetworkError(e.to_string()))?;

        if !response.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AuthError::AuthorizationDenied(format!(
                "User lookup returned {}: {}",
                response.status, body
            )));
        }

        let info: UserInfoResponse = response
            .json()
            .map_err(|e| AuthError::parse("user info response", e))?;

        debug!("Resolved authenticated user");
        Ok(info.data.username)
    }

    async fn post_token_request(&self, params: &[(&str, &str)]) -> Result<HttpResponse> {
        let encoded_body = serde_urlencoded::to_string(params)
            .map_err(|e| AuthError::parse("token request", e))?;

        let mut request = HttpRequest::new(HttpMethod::Post, self.config.token_url.clone())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Bytes::from(encoded_body));

        if let Some(secret) = self.config.client_secret.as_deref() {
            let basic = STANDARD.encode(format!("{}:{}", self.config.client_id, secret));
            request = request.header("Authorization", format!("Basic {}", basic));
        }

        self.http_client
            .execute(request)
            .await
            .map_err(|e| AuthError::NetworkError(e.to_string()))
    }
}

fn parse_token_response(response: &HttpResponse) -> Result<TokenGrant> {
    let token_response: TokenResponse = response
        .json()
        .map_err(|e| AuthError::parse("token response", e))?;

    Ok(TokenGrant {
        access_token: token_response.access_token,
        refresh_token: token_response.refresh_token,
        expires_in: token_response.expires_in,
    })
}

/// Token response from the OAuth provider.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    7200
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    data: UserInfo,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    username: String,
}
