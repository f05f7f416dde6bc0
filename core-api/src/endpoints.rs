//! Known X API endpoints.

/// Path of the chunked media upload endpoint.
pub const MEDIA_UPLOAD_ENDPOINT: &str = "/2/media/upload";

/// Endpoints that deliver an unbounded stream of newline-delimited JSON.
pub const STREAMING_ENDPOINTS: &[&str] = &[
    "/2/tweets/search/stream",
    "/2/tweets/sample/stream",
    "/2/tweets/sample10/stream",
    "/2/tweets/firehose/stream",
    "/2/tweets/firehose/stream/lang/en",
    "/2/tweets/firehose/stream/lang/ja",
    "/2/tweets/firehose/stream/lang/ko",
    "/2/tweets/firehose/stream/lang/pt",
];

/// Whether `endpoint` (a path or an absolute URL) is a streaming endpoint.
pub fn is_streaming_endpoint(endpoint: &str) -> bool {
    let path = if endpoint.to_ascii_lowercase().starts_with("http") {
        match endpoint.splitn(4, '/').nth(3) {
            Some(rest) => format!("/{}", rest),
            None => return false,
        }
    } else {
        endpoint.to_string()
    };

    let path = path.split(['?', '#']).next().unwrap_or_default();
    let path = path.strip_suffix('/').unwrap_or(path);

    STREAMING_ENDPOINTS.contains(&path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streaming_detection() {
        assert!(is_streaming_endpoint("/2/tweets/search/stream"));
        assert!(is_streaming_endpoint("/2/tweets/search/stream/"));
        assert!(is_streaming_endpoint(
            "https://api.x.com/2/tweets/sample/stream?tweet.fields=id"
        ));
        assert!(!is_streaming_endpoint("/2/tweets/search/recent"));
        assert!(!is_streaming_endpoint("/2/users/me"));
        assert!(!is_streaming_endpoint("https://api.x.com"));
    }
}
