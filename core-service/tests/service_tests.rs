//! Integration tests for the core service façade

use async_trait::async_trait;
use bridge_traits::{
    error::Result as BridgeResult, HttpClient, HttpRequest, HttpResponse, HttpStream, SystemClock,
    UrlOpener,
};
use bytes::Bytes;
use core_api::RequestOptions;
use core_auth::OAuth1Credential;
use core_runtime::config::ClientConfig;
use core_service::{
    ClearTarget, CoreDependencies, CoreError, CoreService, ErrorKind, RequestOutcome,
};
use mockall::mock;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use tempfile::TempDir;

mock! {
    Http {}

    #[async_trait]
    impl HttpClient for Http {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        async fn execute_stream(&self, request: HttpRequest) -> BridgeResult<HttpStream>;
    }
}

struct NoBrowser;

impl UrlOpener for NoBrowser {
    fn open(&self, _url: &str) -> BridgeResult<()> {
        Ok(())
    }
}

fn config(dir: &TempDir) -> ClientConfig {
    ClientConfig::builder()
        .client_id("cid")
        .api_base_url("https://api.example.test")
        .token_store_path(dir.path().join(".xurl"))
        .legacy_credentials_path(dir.path().join(".twurlrc"))
        .build()
        .unwrap()
}

fn service(dir: &TempDir, http: MockHttp) -> CoreService {
    CoreService::new(
        config(dir),
        CoreDependencies::new(Arc::new(http), Arc::new(NoBrowser), Arc::new(SystemClock)),
    )
    .unwrap()
}

#[tokio::test]
async fn test_requires_token_store_path() {
    let config = ClientConfig::builder().build().unwrap();
    let result = CoreService::new(
        config,
        CoreDependencies::new(
            Arc::new(MockHttp::new()),
            Arc::new(NoBrowser),
            Arc::new(SystemClock),
        ),
    );
    assert!(matches!(result, Err(CoreError::InitializationFailed(_))));
}

#[tokio::test]
async fn test_malformed_store_is_parse_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(".xurl"), "{not json").unwrap();

    let result = CoreService::new(
        config(&dir),
        CoreDependencies::new(
            Arc::new(MockHttp::new()),
            Arc::new(NoBrowser),
            Arc::new(SystemClock),
        ),
    );
    let err = result.err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[tokio::test]
async fn test_legacy_file_is_imported_on_startup() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(".twurlrc"),
        "profiles:\n  u:\n    CK: {consumer_secret: CS, token: T, secret: S}\nbearer_tokens:\n  CK: BEARER-12345678\n",
    )
    .unwrap();

    let service = service(&dir, MockHttp::new());
    let status = service.auth_status().await;

    assert_eq!(status.oauth1_consumer_key.as_deref(), Some("****"));
    assert_eq!(status.bearer_token.as_deref(), Some("****5678"));
    assert!(dir.path().join(".xurl").exists());
}

#[tokio::test]
async fn test_save_status_and_clear() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir, MockHttp::new());

    service.save_app_bearer("app-token-abcd").await.unwrap();
    service
        .save_oauth1(OAuth1Credential::new("t", "s", "consumer-key-1", "cs"))
        .await
        .unwrap();

    let status = service.auth_status().await;
    assert!(status.oauth2_accounts.is_empty());
    assert_eq!(status.bearer_token.as_deref(), Some("****abcd"));
    assert_eq!(status.oauth1_consumer_key.as_deref(), Some("****ey-1"));

    service.clear_auth(ClearTarget::Bearer).await.unwrap();
    let status = service.auth_status().await;
    assert!(status.bearer_token.is_none());
    assert!(status.oauth1_consumer_key.is_some());

    service.clear_auth(ClearTarget::All).await.unwrap();
    let status = service.auth_status().await;
    assert!(status.oauth1_consumer_key.is_none());
}

#[tokio::test]
async fn test_execute_dispatches_json_and_stream() {
    let dir = TempDir::new().unwrap();
    let mut http = MockHttp::new();
    http.expect_execute()
        .times(1)
        .withf(|req| req.url == "https://api.example.test/2/users/me")
        .returning(|_| {
            Ok(HttpResponse {
                status: 200,
                headers: HashMap::new(),
                body: Bytes::from_static(br#"{"data":{"username":"erin"}}"#),
            })
        });
    http.expect_execute_stream()
        .times(1)
        .withf(|req| req.url.ends_with("/2/tweets/search/stream"))
        .returning(|_| {
            Ok(HttpStream {
                status: 200,
                headers: HashMap::new(),
                body: Box::new(Cursor::new(b"{\"id\":1}\n".to_vec())),
            })
        });

    let service = service(&dir, http);
    service.save_app_bearer("app").await.unwrap();

    match service
        .execute(&RequestOptions::get("/2/users/me"), None, false)
        .await
        .unwrap()
    {
        RequestOutcome::Json(value) => assert_eq!(value["data"]["username"], "erin"),
        RequestOutcome::Stream(_) => panic!("expected JSON"),
    }

    match service
        .execute(&RequestOptions::get("/2/tweets/search/stream"), None, false)
        .await
        .unwrap()
    {
        RequestOutcome::Stream(mut lines) => {
            assert_eq!(lines.next_line().await.unwrap().unwrap(), r#"{"id":1}"#);
        }
        RequestOutcome::Json(_) => panic!("expected stream"),
    }
}

#[tokio::test]
async fn test_raw_append_uses_media_file() {
    let dir = TempDir::new().unwrap();
    let media = dir.path().join("photo.jpg");
    std::fs::write(&media, b"jpeg-bytes").unwrap();

    let mut http = MockHttp::new();
    http.expect_execute()
        .times(1)
        .withf(|req| {
            let Some(form) = req.multipart.as_ref() else {
                return false;
            };
            form.field("media_id") == Some("77")
                && form.field("segment_index") == Some("0")
                && form.files[0].file_name == "photo.jpg"
                && form.files[0].data.as_ref() == b"jpeg-bytes"
        })
        .returning(|_| {
            Ok(HttpResponse {
                status: 204,
                headers: HashMap::new(),
                body: Bytes::new(),
            })
        });

    let service = service(&dir, http);
    service.save_app_bearer("app").await.unwrap();

    let outcome = service
        .execute(
            &RequestOptions::post("/2/media/upload?command=APPEND&media_id=77"),
            media.to_str(),
            false,
        )
        .await
        .unwrap();
    assert!(matches!(outcome, RequestOutcome::Json(_)));
}

#[tokio::test]
async fn test_no_credentials_is_auth_kind() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir, MockHttp::new());

    let err = service
        .execute(&RequestOptions::get("/2/users/me"), None, false)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);
}
