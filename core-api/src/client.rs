//! Authenticated X API client
//!
//! Resolves endpoints against the configured base URL, attaches the
//! `Authorization` header chosen by [`AuthSelector`] and turns responses into
//! JSON values.

use crate::error::{ApiError, Result};
use crate::request::RequestOptions;
use crate::stream::LineStream;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, MultipartForm};
use bytes::Bytes;
use core_auth::AuthSelector;
use core_runtime::config::ClientConfig;
use core_runtime::logging::redact_if_sensitive;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, instrument, warn};

const JSON_CONTENT_TYPE: &str = "application/json";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// X API client
///
/// # Example
///
/// ```ignore
/// use core_api::{ApiClient, RequestOptions};
///
/// let me = client.send(&RequestOptions::get("/2/users/me")).await?;
/// println!("{}", me["data"]["username"]);
/// ```
pub struct ApiClient {
    http_client: Arc<dyn HttpClient>,
    selector: Arc<AuthSelector>,
    base_url: String,
    user_agent: String,
}

impl ApiClient {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        selector: Arc<AuthSelector>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            http_client,
            selector,
            base_url: config.api_base_url.clone(),
            user_agent: config.user_agent.clone(),
        }
    }

    pub fn selector(&self) -> &Arc<AuthSelector> {
        &self.selector
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for `endpoint`. Absolute URLs pass through unchanged.
    pub fn resolve_url(&self, endpoint: &str) -> String {
        if endpoint.to_ascii_lowercase().starts_with("http") {
            return endpoint.to_string();
        }

        let mut url = self.base_url.clone();
        if !url.ends_with('/') {
            url.push('/');
        }
        url.push_str(endpoint.strip_prefix('/').unwrap_or(endpoint));
        url
    }

    /// Build the request for `options` with caller headers, auth and
    /// User-Agent applied. A caller-supplied `Authorization` header wins.
    async fn build_request(
        &self,
        options: &RequestOptions,
        content_type: Option<&str>,
    ) -> Result<HttpRequest> {
        let url = self.resolve_url(&options.endpoint);
        let mut request = HttpRequest::new(options.method, url);

        for (name, value) in options.parsed_headers() {
            request = request.header(name, value);
        }

        if let Some(content_type) = content_type {
            request = request.header("Content-Type", content_type);
        }

        if request.header_value("Authorization").is_none() {
            let header = self
                .selector
                .header_for(
                    options.method,
                    &request.url,
                    options.auth,
                    options.username.as_deref(),
                )
                .await?;
            request = request.header("Authorization", header);
        }

        Ok(request.header("User-Agent", self.user_agent.clone()))
    }

    /// Send a request and return the JSON response.
    ///
    /// A body is sent only for POST, PUT and PATCH; it is labelled JSON when
    /// it parses as JSON.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Api`] for a non-2xx response, carrying its payload
    /// - [`ApiError::Auth`] if no `Authorization` header can be produced
    #[instrument(skip(self, options), fields(method = %options.method, endpoint = %options.endpoint))]
    pub async fn send(&self, options: &RequestOptions) -> Result<Value> {
        let body = options.body();
        let content_type = body.filter(|b| is_json(b)).map(|_| JSON_CONTENT_TYPE);

        let mut request = self.build_request(options, content_type).await?;
        if let Some(body) = body {
            request = request.body(Bytes::from(body.to_string()));
        }

        debug!(url = %request.url, headers = ?loggable_headers(&request), "Sending API request");
        let response = self.http_client.execute(request).await?;
        process_response(response)
    }

    /// Send a multipart form and return the JSON response.
    #[instrument(skip(self, options, form), fields(endpoint = %options.endpoint))]
    pub async fn send_multipart(
        &self,
        options: &RequestOptions,
        form: MultipartForm,
    ) -> Result<Value> {
        let request = self.build_request(options, None).await?.multipart(form);

        debug!(url = %request.url, headers = ?loggable_headers(&request), "Sending multipart request");
        let response = self.http_client.execute(request).await?;
        process_response(response)
    }

    /// Open a streaming request and return its lines.
    ///
    /// Non-JSON bodies are sent form-encoded. No timeout applies to the
    /// stream.
    #[instrument(skip(self, options), fields(endpoint = %options.endpoint))]
    pub async fn stream(&self, options: &RequestOptions) -> Result<LineStream> {
        let body = options.body();
        let content_type = body.map(|b| {
            if is_json(b) {
                JSON_CONTENT_TYPE
            } else {
                FORM_CONTENT_TYPE
            }
        });

        let mut request = self.build_request(options, content_type).await?;
        if let Some(body) = body {
            request = request.body(Bytes::from(body.to_string()));
        }

        info!(url = %request.url, "Connecting to streaming endpoint");
        let mut stream = self.http_client.execute_stream(request).await?;

        if !stream.is_success() {
            let mut raw = Vec::new();
            stream.body.read_to_end(&mut raw).await?;
            let body: Value = serde_json::from_slice(&raw)
                .map_err(|e| ApiError::parse("streaming error response", e))?;
            warn!(status = stream.status, "Streaming request rejected");
            return Err(ApiError::Api {
                status: stream.status,
                body,
            });
        }

        Ok(LineStream::new(stream.body))
    }

    /// Convenience for `GET`-style calls that only need a method and path.
    pub async fn request(&self, method: HttpMethod, endpoint: &str) -> Result<Value> {
        self.send(&RequestOptions::new(method, endpoint)).await
    }
}

/// Request headers sorted by name with credential values redacted.
fn loggable_headers(request: &HttpRequest) -> Vec<(String, String)> {
    let mut headers: Vec<_> = request
        .headers
        .iter()
        .map(|(name, value)| (name.clone(), redact_if_sensitive(name, value)))
        .collect();
    headers.sort();
    headers
}

fn is_json(body: &str) -> bool {
    serde_json::from_str::<serde::de::IgnoredAny>(body).is_ok()
}

/// Turn a buffered response into JSON.
///
/// An empty body is `{}`. A non-JSON body is `{}` on success and
/// [`ApiError::Http`] otherwise.
pub fn process_response(response: HttpResponse) -> Result<Value> {
    let value = if response.body.is_empty() {
        Value::Object(Default::default())
    } else {
        match serde_json::from_slice::<Value>(&response.body) {
            Ok(value) => value,
            Err(_) if !response.is_success() => return Err(ApiError::Http(response.status)),
            Err(_) => Value::Object(Default::default()),
        }
    };

    if !response.is_success() {
        warn!(status = response.status, "API returned an error");
        return Err(ApiError::Api {
            status: response.status,
            body: value,
        });
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn response(status: u16, body: &'static str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    #[test]
    fn test_process_response_empty_body() {
        assert_eq!(
            process_response(response(204, "")).unwrap(),
            serde_json::json!({})
        );
    }

    #[test]
    fn test_process_response_error_payload_verbatim() {
        let err = process_response(response(
            403,
            r#"{"title":"Forbidden","detail":"nope","status":403}"#,
        ))
        .unwrap_err();

        match err {
            ApiError::Api { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body["detail"], "nope");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_process_response_non_json() {
        assert_eq!(
            process_response(response(200, "<html>")).unwrap(),
            serde_json::json!({})
        );
        assert!(matches!(
            process_response(response(502, "<html>bad gateway</html>")),
            Err(ApiError::Http(502))
        ));
    }

    #[test]
    fn test_loggable_headers_redact_credentials() {
        let request = HttpRequest::new(HttpMethod::Get, "https://api.example.test/2/users/me")
            .header("Authorization", "Bearer secret-token")
            .header("User-Agent", "xapi/0.1");

        assert_eq!(
            loggable_headers(&request),
            vec![
                ("Authorization".to_string(), "[REDACTED]".to_string()),
                ("User-Agent".to_string(), "xapi/0.1".to_string()),
            ]
        );
    }

    #[test]
    fn test_is_json() {
        assert!(is_json(r#"{"text":"hello"}"#));
        assert!(is_json("[1,2]"));
        assert!(!is_json("status=hello"));
    }
}
