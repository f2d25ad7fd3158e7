//! # Response Cache
//!
//! One file per cacheable request under `<cache dir>/<subdir>/`, named by the
//! SHA-256 of the request URL and query string.
//!
//! Freshness is purely time based: an entry is fresh while
//! `now - modified_at < ttl`, with `now` taken from the configured clock.
//! Entries are overwritten on every successful refresh and never evicted.
//! A failed write may leave a truncated file that looks valid until the next
//! refresh overwrites it.

use crate::descriptor::RequestDescriptor;
use crate::error::{RequestError, Result};
use bridge_traits::{Clock, FileSystemAccess};
use bytes::Bytes;
use core_runtime::config::EngineConfig;
use core_runtime::logging::strip_path;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// State of the cache file backing one descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub path: PathBuf,
    pub exists: bool,
    /// Modification time in milliseconds since the Unix epoch.
    pub modified_at: Option<i64>,
}

impl CacheEntry {
    /// Whether the entry exists and is younger than `ttl` at `now_millis`.
    pub fn is_fresh(&self, now_millis: i64, ttl: Duration) -> bool {
        let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        match (self.exists, self.modified_at) {
            (true, Some(modified_at)) => now_millis.saturating_sub(modified_at) < ttl_millis,
            _ => false,
        }
    }
}

/// Disk cache for response bodies.
#[derive(Clone)]
pub struct CacheStore {
    file_system: Arc<dyn FileSystemAccess>,
    clock: Arc<dyn Clock>,
    subdir: String,
}

impl CacheStore {
    pub fn new(
        file_system: Arc<dyn FileSystemAccess>,
        clock: Arc<dyn Clock>,
        subdir: impl Into<String>,
    ) -> Self {
        Self {
            file_system,
            clock,
            subdir: subdir.into(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            Arc::clone(&config.file_system),
            Arc::clone(&config.clock),
            config.cache_subdir.clone(),
        )
    }

    /// Hex SHA-256 of the base URL followed by the serialized query string.
    pub fn cache_key(descriptor: &RequestDescriptor) -> String {
        let mut hasher = Sha256::new();
        hasher.update(descriptor.base_url().as_bytes());
        hasher.update(descriptor.query_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    async fn directory(&self) -> Result<PathBuf> {
        let root = self
            .file_system
            .get_cache_directory()
            .await
            .map_err(RequestError::Cache)?;
        Ok(root.join(&self.subdir))
    }

    /// Path of the file backing `descriptor`.
    pub async fn path_for(&self, descriptor: &RequestDescriptor) -> Result<PathBuf> {
        Ok(self.directory().await?.join(Self::cache_key(descriptor)))
    }

    pub async fn lookup(&self, descriptor: &RequestDescriptor) -> Result<CacheEntry> {
        let path = self.path_for(descriptor).await?;

        let exists = self
            .file_system
            .exists(&path)
            .await
            .map_err(RequestError::Cache)?;

        let modified_at = if exists {
            self.file_system
                .metadata(&path)
                .await
                .map_err(RequestError::Cache)?
                .modified_at
        } else {
            None
        };

        debug!(
            file = %strip_path(&path.to_string_lossy()),
            exists,
            modified_at = ?modified_at,
            "Cache lookup"
        );

        Ok(CacheEntry {
            path,
            exists,
            modified_at,
        })
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.unix_timestamp_millis()
    }

    pub fn is_fresh(&self, entry: &CacheEntry, ttl: Duration) -> bool {
        entry.is_fresh(self.now_millis(), ttl)
    }

    pub async fn read(&self, entry: &CacheEntry) -> Result<Bytes> {
        self.file_system
            .read_file(&entry.path)
            .await
            .map_err(RequestError::Cache)
    }

    /// Store `body` for `descriptor`, creating the cache directory on demand.
    pub async fn put(&self, descriptor: &RequestDescriptor, body: Bytes) -> Result<PathBuf> {
        let directory = self.directory().await?;
        self.file_system
            .create_dir_all(&directory)
            .await
            .map_err(RequestError::Cache)?;

        let path = directory.join(Self::cache_key(descriptor));
        let size = body.len();
        self.file_system
            .write_file(&path, body)
            .await
            .map_err(RequestError::Cache)?;

        debug!(file = %strip_path(&path.to_string_lossy()), size, "Cached response");
        Ok(path)
    }

    /// Delete the entry for `descriptor`. Returns whether a file was removed.
    pub async fn invalidate(&self, descriptor: &RequestDescriptor) -> Result<bool> {
        let path = self.path_for(descriptor).await?;
        if !self
            .file_system
            .exists(&path)
            .await
            .map_err(RequestError::Cache)?
        {
            return Ok(false);
        }

        self.file_system
            .delete_file(&path)
            .await
            .map_err(RequestError::Cache)?;
        Ok(true)
    }
}
