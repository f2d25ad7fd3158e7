//! Entry point for creating requests.

use crate::cache::CacheStore;
use crate::decoder::ResponseDecoder;
use crate::descriptor::RequestDescriptor;
use crate::error::Result;
use crate::task::RequestTask;
use core_runtime::config::EngineConfig;
use std::sync::Arc;
use tracing::debug;

/// Creates [`RequestTask`]s that share one immutable configuration.
///
/// Cheap to clone.
///
/// ```ignore
/// let engine = RequestEngine::with_desktop_defaults()?;
/// let descriptor = RequestDescriptor::get("https://api.example.com/me")
///     .cache_ttl(Duration::from_secs(300))
///     .build()?;
///
/// let handle = engine
///     .request(descriptor, JsonDecoder::<Profile>::new())
///     .spawn(Arc::new(ProfileListener));
/// ```
#[derive(Clone)]
pub struct RequestEngine {
    config: Arc<EngineConfig>,
}

impl RequestEngine {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        debug!(config = ?config, "Request engine created");
        Self { config }
    }

    pub fn from_config(config: EngineConfig) -> Self {
        Self::new(Arc::new(config))
    }

    /// Engine over the desktop bridges with default settings.
    #[cfg(feature = "desktop-shims")]
    pub fn with_desktop_defaults() -> Result<Self> {
        let config = EngineConfig::builder().build()?;
        Ok(Self::from_config(config))
    }

    pub fn config(&self) -> &Arc<EngineConfig> {
        &self.config
    }

    /// Prepare a request. Nothing happens until the task is executed or
    /// spawned.
    pub fn request<D: ResponseDecoder>(
        &self,
        descriptor: RequestDescriptor,
        decoder: D,
    ) -> RequestTask<D> {
        RequestTask::new(Arc::clone(&self.config), descriptor, decoder)
    }

    pub fn cache_store(&self) -> CacheStore {
        CacheStore::from_config(&self.config)
    }

    /// Drop the cached response for `descriptor`, if any.
    pub async fn invalidate_cache(&self, descriptor: &RequestDescriptor) -> Result<bool> {
        self.cache_store().invalidate(descriptor).await
    }
}

impl std::fmt::Debug for RequestEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestEngine")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::RawDecoder;
    use crate::outcome::Outcome;
    use async_trait::async_trait;
    use bridge_desktop::TokioFileSystem;
    use bridge_traits::{error::Result as BridgeResult, HttpClient, HttpRequest, HttpResponse};
    use bytes::Bytes;
    use mockall::mock;
    use std::time::Duration;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn engine(client: MockHttpClient, root: std::path::PathBuf) -> RequestEngine {
        RequestEngine::from_config(
            EngineConfig::builder()
                .http_client(Arc::new(client))
                .file_system(Arc::new(TokioFileSystem::with_cache_directory(root)))
                .build()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let root = std::env::temp_dir().join(format!("core-request-engine-{}", uuid::Uuid::new_v4()));
        let mut client = MockHttpClient::new();
        client
            .expect_execute()
            .times(2)
            .returning(|_| Ok(HttpResponse::new(200, "fresh")));
        let engine = engine(client, root.clone());

        let descriptor = RequestDescriptor::get("https://api.test/feed")
            .cache_ttl(Duration::from_secs(600))
            .build()
            .unwrap();

        for _ in 0..2 {
            let outcome = engine.request(descriptor.clone(), RawDecoder).execute().await;
            assert_eq!(outcome, Some(Outcome::Success(Bytes::from_static(b"fresh"))));
        }

        assert!(engine.invalidate_cache(&descriptor).await.unwrap());
        assert!(!engine.invalidate_cache(&descriptor).await.unwrap());

        let outcome = engine.request(descriptor, RawDecoder).execute().await;
        assert_eq!(outcome, Some(Outcome::Success(Bytes::from_static(b"fresh"))));

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[test]
    fn test_engine_shares_config() {
        let root = std::env::temp_dir().join("core-request-engine-unused");
        let engine = engine(MockHttpClient::new(), root);
        let clone = engine.clone();
        assert!(Arc::ptr_eq(engine.config(), clone.config()));
    }
}
