//! # Authentication Module
//!
//! Credential storage and request authorization for the X API.
//!
//! ## Overview
//!
//! - [`TokenStore`] persists OAuth2 accounts, one OAuth1 credential and one
//!   app bearer token, importing from the legacy `~/.twurlrc` file once
//! - [`OAuth1Signer`] produces HMAC-SHA1 `Authorization` headers
//! - [`OAuthFlowManager`] and [`CallbackListener`] run the OAuth 2.0
//!   authorization code flow with PKCE
//! - [`TokenRefresher`] renews expired OAuth2 access tokens
//! - [`AuthSelector`] picks the credential for each request
//!
//! ## Example
//!
//! ```ignore
//! use core_auth::{AuthSelector, AuthScheme};
//! use bridge_traits::HttpMethod;
//!
//! let header = selector
//!     .header_for(HttpMethod::Get, "https://api.x.com/2/users/me", None, None)
//!     .await?;
//! ```

pub mod error;
pub mod legacy;
pub mod listener;
pub mod oauth;
pub mod oauth1;
pub mod refresher;
pub mod selector;
pub mod token_store;
pub mod types;

pub use error::{AuthError, Result};
pub use legacy::LegacyCredentials;
pub use listener::{CallbackListener, CallbackParams};
pub use oauth::{default_scopes, OAuthConfig, OAuthFlowManager, PkceVerifier, TokenGrant};
pub use oauth1::OAuth1Signer;
pub use refresher::TokenRefresher;
pub use selector::AuthSelector;
pub use token_store::TokenStore;
pub use types::{AuthScheme, Credential, OAuth1Credential, OAuth2Credential};
