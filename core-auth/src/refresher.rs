use crate::error::{AuthError, Result};
use crate::oauth::OAuthFlowManager;
use crate::token_store::TokenStore;
use std::sync::Arc;
use tracing::{info, instrument};

/// Exchanges a stored refresh token for a new access token.
pub struct TokenRefresher {
    flow: Arc<OAuthFlowManager>,
}

impl TokenRefresher {
    pub fn new(flow: Arc<OAuthFlowManager>) -> Self {
        Self { flow }
    }

    /// Refresh the account `username` and persist the result.
    ///
    /// The previous refresh token is kept when the server does not rotate
    /// it. Returns the new access token. There is no retry.
    #[instrument(skip(self, store))]
    pub async fn refresh(&self, store: &mut TokenStore, username: &str) -> Result<String> {
        let current = store
            .oauth2(username)
            .cloned()
            .ok_or_else(|| AuthError::CredentialNotFound(format!("oauth2 account '{}'", username)))?;

        if !current.has_refresh_token() {
            return Err(AuthError::TokenRefreshFailed(format!(
                "no refresh token stored for '{}'",
                username
            )));
        }

        let grant = self
            .flow
            .refresh_access_token(&current.refresh_token)
            .await?;

        let now = self.flow.clock().unix_timestamp();
        let credential = grant.into_credential(now, Some(&current.refresh_token));
        let access_token = credential.access_token.clone();
        let expiration_time = credential.expiration_time;

        store.save_oauth2(username, credential)?;

        info!(username, expiration_time, "Access token refreshed");
        Ok(access_token)
    }
}
