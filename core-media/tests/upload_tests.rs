//! Integration tests for chunked media upload
//!
//! These tests verify:
//! - INIT, APPEND and FINALIZE wire format and segment ordering
//! - "media ID not set" for every command that needs one
//! - STATUS polling counts and back-off
//! - Abort on the first failed APPEND

use async_trait::async_trait;
use bridge_traits::{
    error::Result as BridgeResult, HttpClient, HttpMethod, HttpRequest, HttpResponse, HttpStream,
    SystemClock, UrlOpener,
};
use bytes::Bytes;
use core_api::{ApiClient, ApiError};
use core_auth::{AuthSelector, OAuthConfig, OAuthFlowManager, TokenStore};
use core_media::{
    execute_upload, MediaError, MediaUploader, UploadOptions, UploadState, CHUNK_SIZE,
};
use core_runtime::config::ClientConfig;
use mockall::mock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
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

fn response(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        headers: HashMap::new(),
        body: Bytes::from(body.to_string()),
    }
}

fn api(dir: &TempDir, http: MockHttp) -> Arc<ApiClient> {
    let config = ClientConfig::builder()
        .api_base_url("https://api.example.test")
        .build()
        .unwrap();

    let mut store = TokenStore::empty(dir.path().join(".xurl"));
    store.save_bearer("app").unwrap();

    let flow = OAuthFlowManager::new(
        OAuthConfig::from_client_config(&config),
        Arc::new(MockHttp::new()),
        Arc::new(SystemClock),
    );
    let selector = AuthSelector::new(
        store,
        Arc::new(flow),
        Arc::new(NoBrowser),
        Duration::from_secs(1),
    );

    Arc::new(ApiClient::new(Arc::new(http), Arc::new(selector), &config))
}

fn media_file(dir: &TempDir, len: usize) -> std::path::PathBuf {
    let path = dir.path().join("clip.mp4");
    let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
    std::fs::write(&path, data).unwrap();
    path
}

fn is_command(req: &HttpRequest, command: &str) -> bool {
    req.url.contains(&format!("command={}", command))
}

#[derive(Debug, Clone)]
struct AppendCall {
    media_id: String,
    segment_index: String,
    file_name: String,
    len: usize,
}

#[tokio::test]
async fn test_full_upload_sends_ordered_segments() {
    let dir = TempDir::new().unwrap();
    let size = 2 * CHUNK_SIZE + 5;
    let path = media_file(&dir, size);

    let appends: Arc<Mutex<Vec<AppendCall>>> = Arc::default();
    let recorded = appends.clone();

    let mut http = MockHttp::new();
    http.expect_execute()
        .withf(|req| is_command(req, "INIT"))
        .times(1)
        .returning(move |req| {
            assert_eq!(req.method, HttpMethod::Post);
            assert!(req.url.starts_with("https://api.example.test/2/media/upload?"));
            assert!(req.url.contains(&format!("total_bytes={}", 2 * CHUNK_SIZE + 5)));
            assert!(req.url.contains("media_type=video%2Fmp4"));
            assert!(req.url.contains("media_category=tweet_video"));
            Ok(response(
                200,
                r#"{"data":{"id":"m-1","expires_after_secs":86400,"media_key":"7_1"}}"#,
            ))
        });
    http.expect_execute()
        .withf(|req| req.multipart.is_some())
        .times(3)
        .returning(move |req| {
            let form = req.multipart.unwrap();
            recorded.lock().unwrap().push(AppendCall {
                media_id: form.field("media_id").unwrap().to_string(),
                segment_index: form.field("segment_index").unwrap().to_string(),
                file_name: form.files[0].file_name.clone(),
                len: form.files[0].data.len(),
            });
            assert_eq!(form.field("command"), Some("APPEND"));
            assert_eq!(form.files[0].name, "media");
            Ok(response(204, ""))
        });
    http.expect_execute()
        .withf(|req| is_command(req, "FINALIZE"))
        .times(1)
        .returning(|req| {
            assert!(req.url.contains("media_id=m-1"));
            Ok(response(200, r#"{"data":{"id":"m-1","size":10}}"#))
        });

    let mut uploader = MediaUploader::new(api(&dir, http), &path, UploadOptions::default()).unwrap();
    assert_eq!(uploader.state(), UploadState::Created);

    uploader.init("video/mp4", "tweet_video").await.unwrap();
    assert_eq!(uploader.media_id(), "m-1");
    assert_eq!(uploader.media_key(), Some("7_1"));
    assert_eq!(uploader.expires_after_secs(), Some(86400));
    assert_eq!(uploader.state(), UploadState::Initialized);

    assert_eq!(uploader.append().await.unwrap(), 3);
    assert_eq!(uploader.state(), UploadState::Appended);

    uploader.finalize().await.unwrap();
    assert_eq!(uploader.state(), UploadState::Finalized);

    let calls = appends.lock().unwrap();
    let indices: Vec<_> = calls.iter().map(|c| c.segment_index.as_str()).collect();
    assert_eq!(indices, vec!["0", "1", "2"]);
    assert!(calls.iter().all(|c| c.media_id == "m-1" && c.file_name == "clip.mp4"));
    assert_eq!(calls.iter().map(|c| c.len).sum::<usize>(), size);
    assert_eq!(calls[0].len, CHUNK_SIZE);
    assert_eq!(calls[2].len, 5);
}

fn expect_init(http: &mut MockHttp, media_id: &'static str) {
    let body = format!(r#"{{"data":{{"id":"{}"}}}}"#, media_id);
    http.expect_execute()
        .withf(|req| is_command(req, "INIT"))
        .times(1)
        .returning(move |_| Ok(response(200, &body)));
}

fn record_appends(http: &mut MockHttp, times: usize) -> Arc<Mutex<Vec<String>>> {
    let indices: Arc<Mutex<Vec<String>>> = Arc::default();
    let recorded = indices.clone();
    http.expect_execute()
        .withf(|req| req.multipart.is_some())
        .times(times)
        .returning(move |req| {
            let form = req.multipart.unwrap();
            recorded
                .lock()
                .unwrap()
                .push(form.field("segment_index").unwrap().to_string());
            Ok(response(204, ""))
        });
    indices
}

#[tokio::test]
async fn test_exact_multiple_of_chunk_size_has_no_trailing_segment() {
    let dir = TempDir::new().unwrap();
    let path = media_file(&dir, 2 * CHUNK_SIZE);

    let mut http = MockHttp::new();
    expect_init(&mut http, "m-7");
    let indices = record_appends(&mut http, 2);

    let mut uploader = MediaUploader::new(api(&dir, http), &path, UploadOptions::default()).unwrap();
    uploader.init("video/mp4", "tweet_video").await.unwrap();

    assert_eq!(uploader.append().await.unwrap(), 2);
    assert_eq!(*indices.lock().unwrap(), vec!["0", "1"]);
    assert_eq!(uploader.state(), UploadState::Appended);
}

#[tokio::test]
async fn test_empty_file_sends_no_segments() {
    let dir = TempDir::new().unwrap();
    let path = media_file(&dir, 0);

    let mut http = MockHttp::new();
    expect_init(&mut http, "m-8");
    let indices = record_appends(&mut http, 0);

    let mut uploader = MediaUploader::new(api(&dir, http), &path, UploadOptions::default()).unwrap();
    assert_eq!(uploader.file_size(), 0);
    uploader.init("image/png", "tweet_image").await.unwrap();

    assert_eq!(uploader.append().await.unwrap(), 0);
    assert!(indices.lock().unwrap().is_empty());
    assert_eq!(uploader.state(), UploadState::Appended);
}

#[tokio::test]
async fn test_commands_require_media_id() {
    let dir = TempDir::new().unwrap();
    let path = media_file(&dir, 10);
    let mut http = MockHttp::new();
    http.expect_execute().times(0);

    let mut uploader = MediaUploader::new(api(&dir, http), &path, UploadOptions::default()).unwrap();

    assert!(matches!(uploader.append().await, Err(MediaError::MediaIdNotSet)));
    assert!(matches!(uploader.finalize().await, Err(MediaError::MediaIdNotSet)));
    assert!(matches!(uploader.check_status().await, Err(MediaError::MediaIdNotSet)));
    assert!(matches!(
        uploader.wait_for_processing().await,
        Err(MediaError::MediaIdNotSet)
    ));
    assert_eq!(uploader.state(), UploadState::Created);
}

#[tokio::test]
async fn test_init_twice_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = media_file(&dir, 10);
    let mut http = MockHttp::new();
    http.expect_execute()
        .times(1)
        .returning(|_| Ok(response(200, r#"{"data":{"id":"m-2"}}"#)));

    let mut uploader = MediaUploader::new(api(&dir, http), &path, UploadOptions::default()).unwrap();
    uploader.init("image/png", "tweet_image").await.unwrap();

    assert!(matches!(
        uploader.init("image/png", "tweet_image").await,
        Err(MediaError::AlreadyInitialized(id)) if id == "m-2"
    ));
}

#[tokio::test]
async fn test_append_aborts_on_first_error() {
    let dir = TempDir::new().unwrap();
    let path = media_file(&dir, CHUNK_SIZE * 2);
    let mut http = MockHttp::new();
    http.expect_execute()
        .withf(|req| is_command(req, "INIT"))
        .times(1)
        .returning(|_| Ok(response(200, r#"{"data":{"id":"m-6"}}"#)));
    http.expect_execute()
        .withf(|req| req.multipart.is_some())
        .times(1)
        .returning(|_| Ok(response(400, r#"{"errors":[{"message":"bad segment"}]}"#)));

    let mut uploader = MediaUploader::new(api(&dir, http), &path, UploadOptions::default()).unwrap();
    uploader.init("video/mp4", "tweet_video").await.unwrap();

    let err = uploader.append().await.unwrap_err();
    assert!(matches!(err, MediaError::Api(ApiError::Api { status: 400, .. })));
    assert_eq!(uploader.state(), UploadState::Appending);
}

#[tokio::test(start_paused = true)]
async fn test_wait_polls_until_succeeded() {
    let dir = TempDir::new().unwrap();
    let polls = Arc::new(Mutex::new(0u32));
    let counter = polls.clone();

    let mut http = MockHttp::new();
    http.expect_execute()
        .withf(|req| is_command(req, "STATUS") && req.method == HttpMethod::Get)
        .times(3)
        .returning(move |_| {
            let mut n = counter.lock().unwrap();
            *n += 1;
            let body = match *n {
                1 => r#"{"data":{"processing_info":{"state":"pending","check_after_secs":2}}}"#,
                2 => r#"{"data":{"processing_info":{"state":"in_progress","check_after_secs":0,"progress_percent":50}}}"#,
                _ => r#"{"data":{"processing_info":{"state":"succeeded","progress_percent":100}}}"#,
            };
            Ok(response(200, body))
        });

    let mut uploader =
        MediaUploader::with_media_id(api(&dir, http), "m-3", UploadOptions::default());

    let started = tokio::time::Instant::now();
    let result = uploader.wait_for_processing().await.unwrap();

    assert_eq!(result["data"]["processing_info"]["state"], "succeeded");
    assert_eq!(*polls.lock().unwrap(), 3);
    assert!(started.elapsed() >= Duration::from_secs(3));
    assert_eq!(uploader.state(), UploadState::Succeeded);
}

#[tokio::test(start_paused = true)]
async fn test_wait_stops_on_failure() {
    let dir = TempDir::new().unwrap();
    let mut http = MockHttp::new();
    http.expect_execute().times(1).returning(|_| {
        Ok(response(
            200,
            r#"{"data":{"processing_info":{"state":"failed","error":{"message":"bad codec"}}}}"#,
        ))
    });

    let mut uploader =
        MediaUploader::with_media_id(api(&dir, http), "m-4", UploadOptions::default());

    match uploader.wait_for_processing().await {
        Err(MediaError::ProcessingFailed(payload)) => {
            assert_eq!(
                payload["data"]["processing_info"]["error"]["message"],
                "bad codec"
            );
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(uploader.state(), UploadState::Failed);
}

#[tokio::test]
async fn test_execute_upload_skips_wait_for_images() {
    let dir = TempDir::new().unwrap();
    let path = media_file(&dir, 100);
    let mut http = MockHttp::new();
    http.expect_execute()
        .withf(|req| is_command(req, "INIT"))
        .times(1)
        .returning(|_| Ok(response(200, r#"{"data":{"id":"m-5"}}"#)));
    http.expect_execute()
        .withf(|req| req.multipart.is_some())
        .times(1)
        .returning(|_| Ok(response(200, "")));
    http.expect_execute()
        .withf(|req| is_command(req, "FINALIZE"))
        .times(1)
        .returning(|_| {
            Ok(response(
                200,
                r#"{"data":{"id":"m-5","processing_info":{"state":"pending"}}}"#,
            ))
        });
    http.expect_execute()
        .withf(|req| is_command(req, "STATUS"))
        .times(0);

    let outcome = execute_upload(
        api(&dir, http),
        &path,
        "image/png",
        "tweet_image",
        true,
        UploadOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.media_id, "m-5");
    assert!(outcome.processing.is_none());
}

#[tokio::test]
async fn test_directory_is_not_a_regular_file() {
    let dir = TempDir::new().unwrap();
    let result = MediaUploader::new(api(&dir, MockHttp::new()), dir.path(), UploadOptions::default());
    assert!(matches!(result, Err(MediaError::NotARegularFile(_))));
}
