use std::{sync::Arc, time::Duration};

use anyhow::Result;
use blob_store::BlobStorage;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use metrics::block_backend::Metrics;
use tracing::info;
use uuid::Uuid;

use crate::{
    config::BackendConfig,
    context::OpContext,
    error,
    lister::{BlockLister, Listing},
    meta::BlockMeta,
    reader::BlockReader,
    source::PayloadSource,
    writer::BlockWriter,
};

/// One handle serving block writes, listings and reads against a bucket.
///
/// Holds no mutable state; clones share the underlying store client and may
/// be used from many tasks at once.
#[derive(Debug, Clone)]
pub struct Backend {
    writer: BlockWriter,
    lister: BlockLister,
    reader: BlockReader,
    operation_timeout: Option<Duration>,
}

impl Backend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        config.validate()?;
        let storage = BlobStorage::new(&config.blob_storage)?;
        Ok(Self::with_storage(storage, config))
    }

    pub fn with_storage(storage: BlobStorage, config: &BackendConfig) -> Self {
        let metrics = Arc::new(Metrics::new());
        Self {
            writer: BlockWriter::new(storage.clone(), metrics.clone()),
            lister: BlockLister::new(
                storage.clone(),
                config.require_meta_for_listing,
                metrics,
            ),
            reader: BlockReader::new(storage),
            operation_timeout: config.operation_timeout(),
        }
    }

    /// A fresh context carrying the configured operation timeout, if any.
    pub fn context(&self) -> OpContext {
        let ctx = OpContext::new();
        match self.operation_timeout {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx,
        }
    }

    pub fn writer(&self) -> &BlockWriter {
        &self.writer
    }

    pub fn lister(&self) -> &BlockLister {
        &self.lister
    }

    pub fn reader(&self) -> &BlockReader {
        &self.reader
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn write(
        &self,
        ctx: &OpContext,
        tenant_id: &str,
        block_id: &Uuid,
        meta: &BlockMeta,
        bloom: Bytes,
        index: Bytes,
        source: &dyn PayloadSource,
    ) -> error::Result<()> {
        self.writer
            .write(ctx, tenant_id, block_id, meta, bloom, index, source)
            .await
    }

    pub async fn tenants(&self, ctx: &OpContext) -> Listing<String> {
        self.lister.tenants(ctx).await
    }

    pub async fn blocks(&self, ctx: &OpContext, tenant_id: &str) -> Listing<Uuid> {
        self.lister.blocks(ctx, tenant_id).await
    }

    pub async fn block_meta(
        &self,
        ctx: &OpContext,
        block_id: &Uuid,
        tenant_id: &str,
    ) -> error::Result<BlockMeta> {
        self.reader.block_meta(ctx, block_id, tenant_id).await
    }

    pub async fn block_meta_with_mod_time(
        &self,
        ctx: &OpContext,
        block_id: &Uuid,
        tenant_id: &str,
    ) -> error::Result<(BlockMeta, DateTime<Utc>)> {
        self.reader
            .block_meta_with_mod_time(ctx, block_id, tenant_id)
            .await
    }

    pub async fn bloom(
        &self,
        ctx: &OpContext,
        block_id: &Uuid,
        tenant_id: &str,
    ) -> error::Result<Bytes> {
        self.reader.bloom(ctx, block_id, tenant_id).await
    }

    pub async fn index(
        &self,
        ctx: &OpContext,
        block_id: &Uuid,
        tenant_id: &str,
    ) -> error::Result<Bytes> {
        self.reader.index(ctx, block_id, tenant_id).await
    }

    pub async fn object(
        &self,
        ctx: &OpContext,
        block_id: &Uuid,
        tenant_id: &str,
        start: u64,
        buffer: &mut [u8],
    ) -> error::Result<usize> {
        self.reader
            .object(ctx, block_id, tenant_id, start, buffer)
            .await
    }

    pub async fn object_exact(
        &self,
        ctx: &OpContext,
        block_id: &Uuid,
        tenant_id: &str,
        start: u64,
        buffer: &mut [u8],
    ) -> error::Result<()> {
        self.reader
            .object_exact(ctx, block_id, tenant_id, start, buffer)
            .await
    }

    /// The store client releases its connections when dropped; nothing is
    /// held beyond that.
    pub fn shutdown(&self) {
        info!("block backend shut down");
    }
}

#[cfg(test)]
mod tests {
    use blob_store::BlobStorageConfig;

    use super::*;
    use crate::{error::Error, source::BytesSource};

    #[tokio::test]
    async fn test_backend_from_disk_config() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = BackendConfig {
            blob_storage: BlobStorageConfig::disk("traces", dir.path().to_str().unwrap()),
            ..Default::default()
        };
        let backend = Backend::new(&config)?;
        let ctx = backend.context();
        let block_id = Uuid::new_v4();
        let meta = BlockMeta::new("tenant", block_id);

        backend
            .write(
                &ctx,
                "tenant",
                &block_id,
                &meta,
                Bytes::from_static(b"bloom"),
                Bytes::from_static(b"index"),
                &BytesSource::new(Bytes::from_static(b"0123456789")),
            )
            .await?;

        let tenants = backend.tenants(&ctx).await;
        assert_eq!(tenants.items, vec!["tenant".to_string()]);
        let blocks = backend.blocks(&ctx, "tenant").await;
        assert_eq!(blocks.items, vec![block_id]);
        assert_eq!(backend.block_meta(&ctx, &block_id, "tenant").await?, meta);

        let mut buffer = [0u8; 4];
        backend
            .object_exact(&ctx, &block_id, "tenant", 3, &mut buffer)
            .await?;
        assert_eq!(&buffer, b"3456");

        assert!(dir.path().join("traces/tenant").join(block_id.to_string()).join("meta.json").exists());
        backend.shutdown();
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_context_uses_configured_timeout() {
        let config = BackendConfig {
            operation_timeout_secs: Some(2),
            ..Default::default()
        };
        let backend = Backend::new(&config).unwrap();
        let ctx = backend.context();
        assert!(ctx.deadline().is_some());

        let res: error::Result<()> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;
        assert!(matches!(res, Err(Error::DeadlineExceeded)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = BackendConfig {
            blob_storage: BlobStorageConfig::memory(""),
            ..Default::default()
        };
        assert!(Backend::new(&config).is_err());
    }
}
