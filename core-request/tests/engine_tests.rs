//! End-to-end behaviour of the request engine against mocked bridges.

use async_trait::async_trait;
use bridge_desktop::TokioFileSystem;
use bridge_traits::{
    error::Result as BridgeResult, BridgeError, Clock, FileMetadata, FileSystemAccess, HttpClient,
    HttpRequest, HttpResponse, NetworkInfo, NetworkMonitor, NetworkType,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use core_request::{
    DecryptionKey, JsonDecoder, Outcome, RawDecoder, RequestDescriptor, RequestEngine,
    RequestError, RequestListener, TextDecoder,
};
use core_runtime::config::EngineConfig;
use mockall::{mock, Sequence};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

mock! {
    HttpClient {}

    #[async_trait]
    impl HttpClient for HttpClient {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
    }
}

mock! {
    FileSystem {}

    #[async_trait]
    impl FileSystemAccess for FileSystem {
        async fn get_cache_directory(&self) -> BridgeResult<PathBuf>;
        async fn exists(&self, path: &Path) -> BridgeResult<bool>;
        async fn metadata(&self, path: &Path) -> BridgeResult<FileMetadata>;
        async fn create_dir_all(&self, path: &Path) -> BridgeResult<()>;
        async fn read_file(&self, path: &Path) -> BridgeResult<Bytes>;
        async fn write_file(&self, path: &Path, data: Bytes) -> BridgeResult<()>;
        async fn delete_file(&self, path: &Path) -> BridgeResult<()>;
    }
}

mock! {
    Monitor {}

    #[async_trait]
    impl NetworkMonitor for Monitor {
        async fn get_network_info(&self) -> BridgeResult<NetworkInfo>;
    }
}

struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Transport that never answers in time.
struct SlowClient;

#[async_trait]
impl HttpClient for SlowClient {
    async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(HttpResponse::new(200, "too late"))
    }
}

#[derive(Default)]
struct RecordingListener {
    calls: Mutex<Vec<String>>,
}

impl RecordingListener {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl<T: std::fmt::Debug> RequestListener<T> for RecordingListener {
    fn on_complete(&self, value: T) {
        self.record(format!("complete:{:?}", value));
    }

    fn on_network_error(&self, message: &str) {
        self.record(format!("network:{}", message));
    }

    fn on_http_status_error(&self, code: u16) {
        self.record(format!("status:{}", code));
    }

    fn on_http_status_error_with_body(&self, code: u16, body: &str) {
        self.record(format!("status_body:{}:{}", code, body));
    }
}

struct Fixture {
    root: PathBuf,
    backoff: Duration,
    monitor: Option<MockMonitor>,
    clock: Option<Arc<dyn Clock>>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            root: std::env::temp_dir().join(format!("core-request-it-{}", uuid::Uuid::new_v4())),
            backoff: Duration::from_millis(20),
            monitor: None,
            clock: None,
        }
    }

    fn offline(mut self) -> Self {
        let mut monitor = MockMonitor::new();
        monitor
            .expect_get_network_info()
            .returning(|| Ok(NetworkInfo::disconnected()));
        self.monitor = Some(monitor);
        self
    }

    fn online(mut self) -> Self {
        let mut monitor = MockMonitor::new();
        monitor
            .expect_get_network_info()
            .returning(|| Ok(NetworkInfo::connected(NetworkType::WiFi)));
        self.monitor = Some(monitor);
        self
    }

    fn clock_at(mut self, now: DateTime<Utc>) -> Self {
        self.clock = Some(Arc::new(FixedClock(now)));
        self
    }

    fn backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    fn engine(self, client: impl HttpClient + 'static) -> (RequestEngine, PathBuf) {
        let mut builder = EngineConfig::builder()
            .http_client(Arc::new(client))
            .file_system(Arc::new(TokioFileSystem::with_cache_directory(
                self.root.clone(),
            )))
            .retry_backoff(self.backoff);

        if let Some(monitor) = self.monitor {
            builder = builder.network_monitor(Arc::new(monitor));
        }
        if let Some(clock) = self.clock {
            builder = builder.clock(clock);
        }

        (RequestEngine::from_config(builder.build().unwrap()), self.root)
    }
}

async fn cleanup(root: &Path) {
    let _ = tokio::fs::remove_dir_all(root).await;
}

fn cached(url: &str) -> RequestDescriptor {
    RequestDescriptor::get(url)
        .cache_ttl(Duration::from_secs(60))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_no_ttl_never_touches_cache() {
    let mut client = MockHttpClient::new();
    client
        .expect_execute()
        .times(1)
        .returning(|_| Ok(HttpResponse::new(200, "live")));
    let (engine, root) = Fixture::new().engine(client);

    let descriptor = RequestDescriptor::get("https://api.test/live").build().unwrap();
    let outcome = engine.request(descriptor, TextDecoder).execute().await;

    assert_eq!(outcome, Some(Outcome::Success("live".to_string())));
    assert!(!root.exists());
}

#[tokio::test]
async fn test_fresh_cache_skips_network() {
    let mut client = MockHttpClient::new();
    client.expect_execute().times(0);
    let (engine, root) = Fixture::new().engine(client);

    let descriptor = cached("https://api.test/profile");
    engine
        .cache_store()
        .put(&descriptor, Bytes::from_static(b"cached profile"))
        .await
        .unwrap();

    let listener = Arc::new(RecordingListener::default());
    let handle = engine
        .request(descriptor, TextDecoder)
        .spawn(listener.clone());
    handle.join().await.unwrap();

    assert_eq!(listener.calls(), vec!["complete:\"cached profile\""]);
    cleanup(&root).await;
}

#[tokio::test]
async fn test_offline_serves_stale_entry() {
    let mut client = MockHttpClient::new();
    client.expect_execute().times(0);
    let (engine, root) = Fixture::new()
        .offline()
        .clock_at(Utc::now() + chrono::Duration::hours(1))
        .engine(client);

    let descriptor = cached("https://api.test/stale");
    engine
        .cache_store()
        .put(&descriptor, Bytes::from_static(b"old news"))
        .await
        .unwrap();

    let outcome = engine.request(descriptor, TextDecoder).execute().await;

    assert_eq!(outcome, Some(Outcome::Success("old news".to_string())));
    cleanup(&root).await;
}

#[tokio::test]
async fn test_online_refreshes_stale_entry() {
    let mut client = MockHttpClient::new();
    client
        .expect_execute()
        .times(1)
        .returning(|_| Ok(HttpResponse::new(200, "new news")));
    let (engine, root) = Fixture::new()
        .online()
        .clock_at(Utc::now() + chrono::Duration::hours(1))
        .engine(client);

    let descriptor = cached("https://api.test/stale");
    let store = engine.cache_store();
    store
        .put(&descriptor, Bytes::from_static(b"old news"))
        .await
        .unwrap();

    let outcome = engine.request(descriptor.clone(), TextDecoder).execute().await;
    assert_eq!(outcome, Some(Outcome::Success("new news".to_string())));

    let entry = store.lookup(&descriptor).await.unwrap();
    assert_eq!(store.read(&entry).await.unwrap(), Bytes::from_static(b"new news"));
    cleanup(&root).await;
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_then_success() {
    let mut client = MockHttpClient::new();
    let mut seq = Sequence::new();
    client
        .expect_execute()
        .times(2)
        .in_sequence(&mut seq)
        .returning(|_| Err(BridgeError::Transport("Connection failed: refused".to_string())));
    client
        .expect_execute()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(HttpResponse::new(200, "third time")));
    let (engine, _root) = Fixture::new()
        .backoff(Duration::from_secs(1))
        .engine(client);

    let descriptor = RequestDescriptor::get("https://api.test/flaky")
        .retry_limit(3)
        .build()
        .unwrap();

    let start = Instant::now();
    let outcome = engine.request(descriptor, TextDecoder).execute().await;
    let elapsed = start.elapsed();

    assert_eq!(outcome, Some(Outcome::Success("third time".to_string())));
    assert!(
        elapsed >= Duration::from_secs(2) && elapsed < Duration::from_millis(2050),
        "elapsed {:?}",
        elapsed
    );
}

#[tokio::test]
async fn test_always_failing_uses_whole_budget() {
    let mut client = MockHttpClient::new();
    client
        .expect_execute()
        .times(4)
        .returning(|_| Err(BridgeError::Transport("Request timed out".to_string())));
    let (engine, _root) = Fixture::new().engine(client);

    let descriptor = RequestDescriptor::get("https://api.test/down")
        .retry_limit(4)
        .build()
        .unwrap();

    match engine.request(descriptor, RawDecoder).execute().await {
        Some(Outcome::NetworkError(message)) => assert!(message.contains("Request timed out")),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let mut client = MockHttpClient::new();
    client
        .expect_execute()
        .times(1)
        .returning(|_| Ok(HttpResponse::new(404, "not found")));
    let (engine, root) = Fixture::new().engine(client);

    let descriptor = cached("https://api.test/missing");
    let listener = Arc::new(RecordingListener::default());
    let handle = engine
        .request(descriptor.clone(), RawDecoder)
        .spawn(listener.clone());
    handle.join().await.unwrap();

    assert_eq!(
        listener.calls(),
        vec!["status:404", "status_body:404:not found"]
    );
    // Error responses are never cached.
    let entry = engine.cache_store().lookup(&descriptor).await.unwrap();
    assert!(!entry.exists);
    cleanup(&root).await;
}

#[tokio::test]
async fn test_security_fault_is_fatal() {
    let mut client = MockHttpClient::new();
    client
        .expect_execute()
        .times(1)
        .returning(|_| Err(BridgeError::Security("invalid peer certificate: UnknownIssuer".to_string())));
    let (engine, _root) = Fixture::new().engine(client);

    let descriptor = RequestDescriptor::get("https://self-signed.test/")
        .retry_limit(5)
        .build()
        .unwrap();

    match engine.request(descriptor, RawDecoder).execute().await {
        Some(Outcome::NetworkError(message)) => {
            assert!(message.starts_with("Security failure"), "{}", message)
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_cancel_suppresses_delivery() {
    let (engine, _root) = Fixture::new().engine(SlowClient);
    let listener = Arc::new(RecordingListener::default());

    let descriptor = RequestDescriptor::get("https://api.test/slow").build().unwrap();
    let handle = engine
        .request(descriptor, RawDecoder)
        .spawn(listener.clone());

    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.cancel();
    assert!(handle.is_cancelled());

    tokio::time::timeout(Duration::from_secs(2), handle.join())
        .await
        .expect("cancelled request should finish promptly")
        .unwrap();

    assert!(listener.calls().is_empty());
}

#[tokio::test]
async fn test_cancel_before_spawn_runs_nothing() {
    let mut client = MockHttpClient::new();
    client.expect_execute().times(0);
    let (engine, _root) = Fixture::new().engine(client);
    let listener = Arc::new(RecordingListener::default());

    let task = engine.request(
        RequestDescriptor::get("https://api.test/never").build().unwrap(),
        RawDecoder,
    );
    task.cancellation_token().cancel();

    let handle = task.spawn(listener.clone());
    handle.join().await.unwrap();

    assert!(listener.calls().is_empty());
}

#[tokio::test]
async fn test_cache_round_trip_is_byte_exact() {
    let mut client = MockHttpClient::new();
    client.expect_execute().times(0);
    let (engine, root) = Fixture::new().engine(client);

    let body: Vec<u8> = (0..=255u8).collect();
    let descriptor = cached("https://api.test/blob");
    engine
        .cache_store()
        .put(&descriptor, Bytes::from(body.clone()))
        .await
        .unwrap();

    let outcome = engine.request(descriptor, RawDecoder).execute().await;

    assert_eq!(outcome, Some(Outcome::Success(Bytes::from(body))));
    cleanup(&root).await;
}

#[tokio::test]
async fn test_redirect_status_is_retried() {
    let mut client = MockHttpClient::new();
    let mut seq = Sequence::new();
    client
        .expect_execute()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(HttpResponse::new(301, "")));
    client
        .expect_execute()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(HttpResponse::new(200, "moved")));
    let (engine, _root) = Fixture::new().engine(client);

    let descriptor = RequestDescriptor::get("https://api.test/old").build().unwrap();
    let outcome = engine.request(descriptor, TextDecoder).execute().await;

    assert_eq!(outcome, Some(Outcome::Success("moved".to_string())));
}

#[tokio::test]
async fn test_cache_write_failure_keeps_success() {
    let blocker = std::env::temp_dir().join(format!("core-request-file-{}", uuid::Uuid::new_v4()));
    tokio::fs::write(&blocker, b"not a directory").await.unwrap();

    let mut client = MockHttpClient::new();
    client
        .expect_execute()
        .times(1)
        .returning(|_| Ok(HttpResponse::new(200, "uncacheable")));
    let engine = RequestEngine::from_config(
        EngineConfig::builder()
            .http_client(Arc::new(client))
            .file_system(Arc::new(TokioFileSystem::with_cache_directory(
                blocker.clone(),
            )))
            .build()
            .unwrap(),
    );

    let outcome = engine
        .request(cached("https://api.test/data"), TextDecoder)
        .execute()
        .await;

    assert_eq!(outcome, Some(Outcome::Success("uncacheable".to_string())));
    let _ = tokio::fs::remove_file(&blocker).await;
}

#[test]
fn test_second_body_is_rejected() {
    let err = RequestDescriptor::post("https://api.test/upload")
        .form_field("a", "1")
        .json_body(serde_json::json!({ "a": 1 }))
        .build()
        .unwrap_err();

    assert!(matches!(
        err,
        RequestError::DuplicateBody {
            existing: "form",
            attempted: "JSON"
        }
    ));
}

#[tokio::test]
async fn test_url_query_precedes_added_params() {
    let mut client = MockHttpClient::new();
    client
        .expect_execute()
        .times(1)
        .withf(|request| request.url == "https://api.test/search?q=rust&page=2")
        .returning(|_| Ok(HttpResponse::new(200, "[]")));
    let (engine, _root) = Fixture::new().engine(client);

    let descriptor = RequestDescriptor::get("https://api.test/search?q=rust")
        .query("page", "2")
        .build()
        .unwrap();
    let outcome = engine
        .request(descriptor, JsonDecoder::<Vec<u32>>::new())
        .execute()
        .await;

    assert_eq!(outcome, Some(Outcome::Success(Vec::new())));
}

#[tokio::test]
async fn test_encrypted_body_decodes_with_key() {
    let key = DecryptionKey::from_bytes(&[9u8; 32]).unwrap();
    let payload = key.encrypt(br#"{"plan":"pro"}"#).unwrap();

    let mut client = MockHttpClient::new();
    client
        .expect_execute()
        .times(2)
        .returning(move |_| Ok(HttpResponse::new(200, payload.clone())));
    let (engine, _root) = Fixture::new().engine(client);

    let descriptor = RequestDescriptor::get("https://api.test/plan")
        .decryption_key(key)
        .build()
        .unwrap();
    let outcome = engine
        .request(descriptor, JsonDecoder::<serde_json::Value>::new())
        .execute()
        .await;
    assert_eq!(
        outcome,
        Some(Outcome::Success(serde_json::json!({ "plan": "pro" })))
    );

    let wrong = RequestDescriptor::get("https://api.test/plan")
        .decryption_key(DecryptionKey::from_bytes(&[1u8; 32]).unwrap())
        .build()
        .unwrap();
    match engine.request(wrong, TextDecoder).execute().await {
        Some(Outcome::DecodeError(message)) => assert!(message.starts_with("Decryption failed")),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_decode_error_reaches_network_error_callback() {
    let mut client = MockHttpClient::new();
    client
        .expect_execute()
        .times(1)
        .returning(|_| Ok(HttpResponse::new(200, "<html>")));
    let (engine, _root) = Fixture::new().engine(client);

    let listener = Arc::new(RecordingListener::default());
    let handle = engine
        .request(
            RequestDescriptor::get("https://api.test/json").build().unwrap(),
            JsonDecoder::<serde_json::Value>::new(),
        )
        .spawn(listener.clone());
    handle.join().await.unwrap();

    let calls = listener.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].starts_with("network:Parse failed"), "{:?}", calls);
}

#[tokio::test]
async fn test_unreadable_cache_entry_is_network_error() {
    let mut file_system = MockFileSystem::new();
    file_system
        .expect_get_cache_directory()
        .returning(|| Ok(PathBuf::from("/cache")));
    file_system.expect_exists().returning(|_| Ok(true));
    file_system.expect_metadata().returning(|_| {
        Ok(FileMetadata {
            size: 8,
            modified_at: Some(Utc::now().timestamp_millis()),
            is_directory: false,
        })
    });
    file_system.expect_read_file().times(1).returning(|_| {
        Err(BridgeError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "permission denied",
        )))
    });

    let mut client = MockHttpClient::new();
    client.expect_execute().times(0);
    let engine = RequestEngine::from_config(
        EngineConfig::builder()
            .http_client(Arc::new(client))
            .file_system(Arc::new(file_system))
            .build()
            .unwrap(),
    );

    match engine
        .request(cached("https://api.test/locked"), RawDecoder)
        .execute()
        .await
    {
        Some(Outcome::NetworkError(message)) => assert!(
            message.starts_with("Failed to read cached response"),
            "{}",
            message
        ),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_debug_logging_of_multibyte_header_value() {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let mut client = MockHttpClient::new();
    client
        .expect_execute()
        .times(1)
        .withf(|request| request.header_value("X-User") == Some("é@example.com"))
        .returning(|_| Ok(HttpResponse::new(200, "ok")));
    let (engine, _root) = Fixture::new().engine(client);

    let descriptor = RequestDescriptor::get("https://api.test/me")
        .header("X-User", "é@example.com")
        .build()
        .unwrap();
    let listener = Arc::new(RecordingListener::default());
    let handle = engine.request(descriptor, TextDecoder).spawn(listener.clone());

    handle.join().await.unwrap();
    assert_eq!(listener.calls(), vec!["complete:\"ok\""]);
}
