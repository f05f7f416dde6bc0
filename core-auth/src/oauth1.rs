//! OAuth 1.0a request signing (HMAC-SHA1).
//!
//! Produces the `Authorization: OAuth ...` header for a request. Signing is a
//! pure function of the request, the credential, a nonce and a timestamp;
//! [`OAuth1Signer::sign`] supplies a fresh nonce and the current time, and
//! [`OAuth1Signer::sign_with`] takes them explicitly.
//!
//! Percent-encoding leaves ASCII alphanumerics and `-._~` untouched, writes
//! every other byte as uppercase `%XX`, and writes a space as `+`. Servers
//! that already accept this client's signatures depend on the `+` form.

use crate::error::{AuthError, Result};
use crate::types::OAuth1Credential;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bridge_traits::http::HttpMethod;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha1::Sha1;
use url::Url;

type HmacSha1 = Hmac<Sha1>;

const ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const NONCE_LEN: usize = 32;

/// Percent-encode a value for signing.
pub fn encode(value: &str) -> String {
    utf8_percent_encode(value, ENCODE_SET)
        .to_string()
        .replace("%20", "+")
}

/// OAuth 1.0a HMAC-SHA1 signer.
#[derive(Debug, Clone, Copy, Default)]
pub struct OAuth1Signer;

impl OAuth1Signer {
    /// Sign with a fresh random nonce and the current Unix time.
    pub fn sign(
        method: HttpMethod,
        url: &str,
        body_params: &[(String, String)],
        credential: &OAuth1Credential,
    ) -> Result<String> {
        let nonce = generate_nonce();
        let timestamp = chrono::Utc::now().timestamp().to_string();
        Self::sign_with(method, url, body_params, credential, &nonce, &timestamp)
    }

    /// Sign with a caller-supplied nonce and timestamp.
    ///
    /// Identical inputs always produce the identical header.
    pub fn sign_with(
        method: HttpMethod,
        url: &str,
        body_params: &[(String, String)],
        credential: &OAuth1Credential,
        nonce: &str,
        timestamp: &str,
    ) -> Result<String> {
        let oauth_params = [
            ("oauth_consumer_key", credential.consumer_key.as_str()),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", timestamp),
            ("oauth_token", credential.access_token.as_str()),
            ("oauth_version", "1.0"),
        ];

        let base = signature_base_string(method, url, &oauth_params, body_params)?;
        let key = format!(
            "{}&{}",
            encode(&credential.consumer_secret),
            encode(&credential.token_secret)
        );
        let signature = hmac_sha1_base64(key.as_bytes(), base.as_bytes())?;

        let mut header_params: Vec<(&str, &str)> = oauth_params.to_vec();
        header_params.push(("oauth_signature", signature.as_str()));
        header_params.sort_by(|a, b| a.0.cmp(b.0));

        let rendered: Vec<String> = header_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect();

        Ok(format!("OAuth {}", rendered.join(", ")))
    }
}

/// Build `METHOD&enc(base_url)&enc(sorted params)`.
///
/// The parameter set is the oauth parameters, the URL's query parameters and
/// any form body parameters, encoded and then sorted by key and value.
pub fn signature_base_string(
    method: HttpMethod,
    url: &str,
    oauth_params: &[(&str, &str)],
    body_params: &[(String, String)],
) -> Result<String> {
    let mut parsed = Url::parse(url).map_err(|e| AuthError::InvalidUrl(format!("{}: {}", url, e)))?;

    let mut params: Vec<(String, String)> = oauth_params
        .iter()
        .map(|(k, v)| (encode(k), encode(v)))
        .collect();
    params.extend(
        parsed
            .query_pairs()
            .map(|(k, v)| (encode(&k), encode(&v))),
    );
    params.extend(body_params.iter().map(|(k, v)| (encode(k), encode(v))));
    params.sort();

    let param_string = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    parsed.set_query(None);
    parsed.set_fragment(None);

    Ok(format!(
        "{}&{}&{}",
        method.as_str(),
        encode(parsed.as_str()),
        encode(&param_string)
    ))
}

fn hmac_sha1_base64(key: &[u8], data: &[u8]) -> Result<String> {
    let mut mac = HmacSha1::new_from_slice(key)
        .map_err(|e| AuthError::parse("HMAC key", e))?;
    mac.update(data);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}
