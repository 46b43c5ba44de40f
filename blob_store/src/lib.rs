use std::{fmt::Debug, sync::Arc};

use anyhow::{anyhow, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use metrics::{blob_storage::Metrics, Timer};
use object_store::{
    memory::InMemory,
    path::Path,
    GetOptions,
    GetRange,
    ObjectMeta,
    ObjectStore,
    PutPayload,
    WriteMultipart,
};
use opentelemetry::KeyValue;
use serde::{Deserialize, Serialize};
use tracing::info;

pub mod disk;
pub mod gcs;
pub mod s3;

pub use self::{disk::DiskStorageConfig, gcs::GcsConfig, s3::S3Config};

pub const DEFAULT_CHUNK_BUFFER_SIZE: usize = 10 * 1024 * 1024;

/// Smallest non-final multipart part accepted by S3 and GCS.
pub const MIN_REMOTE_CHUNK_BUFFER_SIZE: usize = 5 * 1024 * 1024;

fn default_chunk_buffer_size() -> usize {
    DEFAULT_CHUNK_BUFFER_SIZE
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackendConfig {
    S3(S3Config),
    Gcs(GcsConfig),
    Disk(DiskStorageConfig),
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlobStorageConfig {
    /// Bucket (or container) holding every tenant's blocks.
    pub bucket: String,
    /// Bytes buffered per uploaded part when streaming large objects.
    #[serde(default = "default_chunk_buffer_size")]
    pub chunk_buffer_size: usize,
    pub backend: StorageBackendConfig,
}

impl BlobStorageConfig {
    pub fn memory(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            chunk_buffer_size: DEFAULT_CHUNK_BUFFER_SIZE,
            backend: StorageBackendConfig::Memory,
        }
    }

    pub fn disk(bucket: &str, path: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            chunk_buffer_size: DEFAULT_CHUNK_BUFFER_SIZE,
            backend: StorageBackendConfig::Disk(DiskStorageConfig {
                path: path.to_string(),
            }),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.bucket.trim().is_empty() {
            return Err(anyhow!("bucket name is required"));
        }
        if self.bucket.contains('/') {
            return Err(anyhow!(
                "bucket name must not contain '/': {}",
                self.bucket
            ));
        }
        if self.chunk_buffer_size == 0 {
            return Err(anyhow!("chunk_buffer_size must be greater than zero"));
        }
        let remote = matches!(
            self.backend,
            StorageBackendConfig::S3(_) | StorageBackendConfig::Gcs(_)
        );
        if remote && self.chunk_buffer_size < MIN_REMOTE_CHUNK_BUFFER_SIZE {
            return Err(anyhow!(
                "chunk_buffer_size must be at least {} bytes for s3 and gcs, got {}",
                MIN_REMOTE_CHUNK_BUFFER_SIZE,
                self.chunk_buffer_size
            ));
        }
        Ok(())
    }
}

/// Handle to the object store backing a bucket.
///
/// Cloning is cheap; all clones share the same client and connection pool.
#[derive(Clone)]
pub struct BlobStorage {
    object_store: Arc<dyn ObjectStore>,
    chunk_buffer_size: usize,
    metrics: Arc<Metrics>,
}

impl Debug for BlobStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStorage")
            .field("object_store", &self.object_store.to_string())
            .field("chunk_buffer_size", &self.chunk_buffer_size)
            .finish()
    }
}

impl BlobStorage {
    pub fn new(config: &BlobStorageConfig) -> Result<Self> {
        config.validate()?;
        let object_store: Arc<dyn ObjectStore> = match &config.backend {
            StorageBackendConfig::S3(s3) => Arc::new(s3::s3_storage(&config.bucket, s3)?),
            StorageBackendConfig::Gcs(gcs) => Arc::new(gcs::gcs_storage(&config.bucket, gcs)?),
            StorageBackendConfig::Disk(disk) => {
                Arc::new(disk::file_storage(&config.bucket, disk)?)
            }
            StorageBackendConfig::Memory => Arc::new(InMemory::new()),
        };
        info!(
            bucket = %config.bucket,
            store = %object_store,
            chunk_buffer_size = config.chunk_buffer_size,
            "initialized blob storage"
        );
        Ok(Self::with_object_store(
            object_store,
            config.chunk_buffer_size,
        ))
    }

    pub fn with_object_store(object_store: Arc<dyn ObjectStore>, chunk_buffer_size: usize) -> Self {
        Self {
            object_store,
            chunk_buffer_size: chunk_buffer_size.max(1),
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn get_object_store(&self) -> Arc<dyn ObjectStore> {
        self.object_store.clone()
    }

    pub fn chunk_buffer_size(&self) -> usize {
        self.chunk_buffer_size
    }

    /// Writes `data` as the whole value of `key`, replacing any previous value.
    pub async fn put(&self, key: &Path, data: Bytes) -> object_store::Result<()> {
        let labels = [KeyValue::new("op", "put")];
        let _timer = Timer::start_with_labels(&self.metrics.operations, &labels);

        self.object_store.put(key, PutPayload::from(data)).await?;
        Ok(())
    }

    /// Opens a buffered writer that uploads `key` in parts of
    /// `chunk_buffer_size` bytes. Nothing is visible until `finish`.
    pub async fn part_writer(&self, key: &Path) -> object_store::Result<WriteMultipart> {
        let labels = [KeyValue::new("op", "put_multipart")];
        let _timer = Timer::start_with_labels(&self.metrics.operations, &labels);

        let upload = self.object_store.put_multipart(key).await?;
        Ok(WriteMultipart::new_with_chunk_size(
            upload,
            self.chunk_buffer_size,
        ))
    }

    pub async fn read_bytes(&self, key: &Path) -> object_store::Result<Bytes> {
        let labels = [KeyValue::new("op", "get")];
        let _timer = Timer::start_with_labels(&self.metrics.operations, &labels);

        self.object_store.get(key).await?.bytes().await
    }

    pub async fn read_bytes_with_mod_time(
        &self,
        key: &Path,
    ) -> object_store::Result<(Bytes, DateTime<Utc>)> {
        let labels = [KeyValue::new("op", "get")];
        let _timer = Timer::start_with_labels(&self.metrics.operations, &labels);

        let result = self.object_store.get(key).await?;
        let last_modified = result.meta.last_modified;
        let bytes = result.bytes().await?;
        Ok((bytes, last_modified))
    }

    /// Opens a stream over at most `len` bytes of `key` starting at `offset`.
    ///
    /// The stream ends early when the object is shorter than the requested
    /// range. `len` must be non-zero.
    pub async fn get_range(
        &self,
        key: &Path,
        offset: u64,
        len: u64,
    ) -> object_store::Result<BoxStream<'static, object_store::Result<Bytes>>> {
        let labels = [KeyValue::new("op", "get_range")];
        let _timer = Timer::start_with_labels(&self.metrics.operations, &labels);

        let options = GetOptions {
            range: Some(GetRange::Bounded(offset..offset.saturating_add(len))),
            ..Default::default()
        };
        let result = self.object_store.get_opts(key, options).await?;
        Ok(result.into_stream())
    }

    /// Lists one level of "directories" directly below `prefix` (or below
    /// the bucket root when `prefix` is `None`).
    pub async fn list_dirs(&self, prefix: Option<&Path>) -> object_store::Result<Vec<Path>> {
        let labels = [KeyValue::new("op", "list")];
        let _timer = Timer::start_with_labels(&self.metrics.operations, &labels);

        let result = self.object_store.list_with_delimiter(prefix).await?;
        Ok(result.common_prefixes)
    }

    pub async fn head(&self, key: &Path) -> object_store::Result<ObjectMeta> {
        let labels = [KeyValue::new("op", "head")];
        let _timer = Timer::start_with_labels(&self.metrics.operations, &labels);

        self.object_store.head(key).await
    }

    pub async fn exists(&self, key: &Path) -> object_store::Result<bool> {
        match self.head(key).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
