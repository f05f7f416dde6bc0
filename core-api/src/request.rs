use bridge_traits::http::HttpMethod;
use core_auth::AuthScheme;

/// Caller-level description of one API request.
///
/// `endpoint` is either a path relative to the API base URL or an absolute
/// URL. Headers use the `Name: value` form; entries without a colon are
/// skipped.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: HttpMethod,
    pub endpoint: String,
    pub headers: Vec<String>,
    pub data: Option<String>,
    pub auth: Option<AuthScheme>,
    pub username: Option<String>,
}

impl RequestOptions {
    pub fn new(method: HttpMethod, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            headers: Vec::new(),
            data: None,
            auth: None,
            username: None,
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, endpoint)
    }

    pub fn header(mut self, header: impl Into<String>) -> Self {
        self.headers.push(header.into());
        self
    }

    pub fn headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers.extend(headers.into_iter().map(Into::into));
        self
    }

    pub fn data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn auth(mut self, scheme: AuthScheme) -> Self {
        self.auth = Some(scheme);
        self
    }

    pub fn auth_opt(mut self, scheme: Option<AuthScheme>) -> Self {
        self.auth = scheme;
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn username_opt(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }

    /// Body to send, only for methods that carry one.
    pub(crate) fn body(&self) -> Option<&str> {
        match self.method {
            HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch => {
                self.data.as_deref().filter(|d| !d.is_empty())
            }
            _ => None,
        }
    }

    /// Parsed `Name: value` pairs, trimmed.
    pub(crate) fn parsed_headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().filter_map(|header| {
            header
                .split_once(':')
                .map(|(name, value)| (name.trim(), value.trim()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_only_for_methods_with_payload() {
        let get = RequestOptions::get("/2/users/me").data("{}");
        assert_eq!(get.body(), None);

        let post = RequestOptions::post("/2/tweets").data(r#"{"text":"hi"}"#);
        assert_eq!(post.body(), Some(r#"{"text":"hi"}"#));

        let empty = RequestOptions::post("/2/tweets").data("");
        assert_eq!(empty.body(), None);
    }

    #[test]
    fn test_header_parsing_skips_malformed() {
        let options = RequestOptions::get("/")
            .header("X-Trace:  abc ")
            .header("garbage")
            .headers(["Accept: application/json"]);

        let parsed: Vec<_> = options.parsed_headers().collect();
        assert_eq!(
            parsed,
            vec![("X-Trace", "abc"), ("Accept", "application/json")]
        );
    }
}
