use std::sync::Arc;

use blob_store::BlobStorage;
use bytes::Bytes;
use metrics::{block_backend::Metrics, Timer};
use object_store::{path::Path, WriteMultipart};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    context::OpContext,
    error::{Error, Result},
    keys::BlockKeys,
    meta::BlockMeta,
    source::{PayloadReader, PayloadSource},
};

/// Persists the components of a block.
///
/// Components are written strictly one after another: bloom, index, object
/// payload, then meta. Readers treat a block without meta as absent, so a
/// failed write never exposes a partial block. Nothing is rolled back on
/// failure and earlier components may be left behind.
///
/// Concurrent writes of the same block id are not serialized here; callers
/// must not issue them.
#[derive(Debug, Clone)]
pub struct BlockWriter {
    storage: BlobStorage,
    metrics: Arc<Metrics>,
}

impl BlockWriter {
    pub fn new(storage: BlobStorage, metrics: Arc<Metrics>) -> Self {
        Self { storage, metrics }
    }

    #[allow(clippy::too_many_arguments)]
    #[instrument(skip_all, fields(tenant_id = %tenant_id, block_id = %block_id))]
    pub async fn write(
        &self,
        ctx: &OpContext,
        tenant_id: &str,
        block_id: &Uuid,
        meta: &BlockMeta,
        bloom: Bytes,
        index: Bytes,
        source: &dyn PayloadSource,
    ) -> Result<()> {
        let _timer = Timer::start_with_labels(&self.metrics.block_writes, &[]);
        let keys = BlockKeys::new(tenant_id, block_id);

        self.put(ctx, &keys.bloom(), bloom).await?;
        debug!("wrote bloom");

        self.put(ctx, &keys.index(), index).await?;
        debug!("wrote index");

        // bloom and index are already persisted at this point; they stay
        // invisible without meta.
        let location = source.location();
        if !ctx.run(async { Ok(source.exists().await) }).await? {
            return Err(Error::LocalSourceMissing {
                location,
                source: None,
            });
        }
        let reader = ctx
            .run(async {
                source
                    .open()
                    .await
                    .map_err(|e| Error::LocalSourceMissing {
                        location: location.clone(),
                        source: Some(e),
                    })
            })
            .await?;
        let size_bytes = self
            .copy_object(ctx, &keys.object(), reader, &location)
            .await?;
        debug!(size_bytes, "wrote object");

        let bytes = meta
            .to_json()
            .map_err(|source| Error::MetaEncode { source })?;
        self.put(ctx, &keys.meta(), Bytes::from(bytes)).await?;

        info!(size_bytes, "wrote block");
        Ok(())
    }

    async fn put(&self, ctx: &OpContext, key: &Path, data: Bytes) -> Result<()> {
        ctx.run(async {
            self.storage
                .put(key, data)
                .await
                .map_err(|e| Error::from_store(key, e))
        })
        .await
    }

    /// Streams the payload into `key`, holding at most one chunk of the
    /// source in memory at a time.
    async fn copy_object(
        &self,
        ctx: &OpContext,
        key: &Path,
        mut reader: PayloadReader,
        location: &str,
    ) -> Result<u64> {
        let mut writer = ctx
            .run(async {
                self.storage
                    .part_writer(key)
                    .await
                    .map_err(|e| Error::from_store(key, e))
            })
            .await?;

        let copied = pump(
            ctx,
            &mut reader,
            &mut writer,
            self.storage.chunk_buffer_size(),
            key,
            location,
        )
        .await;
        let size_bytes = match copied {
            Ok(size_bytes) => size_bytes,
            Err(err) => {
                if let Err(abort_err) = writer.abort().await {
                    warn!(key = %key, "failed to abort object upload: {}", abort_err);
                }
                return Err(err);
            }
        };

        ctx.run(async {
            writer
                .finish()
                .await
                .map_err(|e| Error::from_store(key, e))
        })
        .await?;
        self.metrics.object_bytes_written.add(size_bytes, &[]);
        Ok(size_bytes)
    }
}

async fn pump(
    ctx: &OpContext,
    reader: &mut PayloadReader,
    writer: &mut WriteMultipart,
    chunk_size: usize,
    key: &Path,
    location: &str,
) -> Result<u64> {
    let mut buf = vec![0u8; chunk_size];
    let mut size_bytes: u64 = 0;
    loop {
        let n = ctx
            .run(async {
                reader.read(&mut buf).await.map_err(|source| Error::SourceRead {
                    location: location.to_string(),
                    source,
                })
            })
            .await?;
        if n == 0 {
            return Ok(size_bytes);
        }
        ctx.run(async {
            writer
                .wait_for_capacity(1)
                .await
                .map_err(|e| Error::from_store(key, e))
        })
        .await?;
        writer.write(&buf[..n]);
        size_bytes += n as u64;
    }
}
