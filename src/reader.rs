use blob_store::BlobStorage;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use object_store::path::Path;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    context::OpContext,
    error::{Error, Result},
    keys::BlockKeys,
    meta::BlockMeta,
};

#[derive(Debug, Clone)]
pub struct BlockReader {
    storage: BlobStorage,
}

impl BlockReader {
    pub fn new(storage: BlobStorage) -> Self {
        Self { storage }
    }

    #[instrument(skip(self, ctx))]
    pub async fn block_meta(
        &self,
        ctx: &OpContext,
        block_id: &Uuid,
        tenant_id: &str,
    ) -> Result<BlockMeta> {
        let key = BlockKeys::new(tenant_id, block_id).meta();
        let bytes = self.read_all(ctx, &key).await?;
        decode_meta(&key, &bytes)
    }

    /// Reads the meta together with the time it was last written.
    #[instrument(skip(self, ctx))]
    pub async fn block_meta_with_mod_time(
        &self,
        ctx: &OpContext,
        block_id: &Uuid,
        tenant_id: &str,
    ) -> Result<(BlockMeta, DateTime<Utc>)> {
        let key = BlockKeys::new(tenant_id, block_id).meta();
        let (bytes, last_modified) = ctx
            .run(async {
                self.storage
                    .read_bytes_with_mod_time(&key)
                    .await
                    .map_err(|e| Error::from_store(&key, e))
            })
            .await?;
        Ok((decode_meta(&key, &bytes)?, last_modified))
    }

    #[instrument(skip(self, ctx))]
    pub async fn bloom(&self, ctx: &OpContext, block_id: &Uuid, tenant_id: &str) -> Result<Bytes> {
        self.read_all(ctx, &BlockKeys::new(tenant_id, block_id).bloom())
            .await
    }

    #[instrument(skip(self, ctx))]
    pub async fn index(&self, ctx: &OpContext, block_id: &Uuid, tenant_id: &str) -> Result<Bytes> {
        self.read_all(ctx, &BlockKeys::new(tenant_id, block_id).index())
            .await
    }

    /// Fills `buffer` with payload bytes starting at `start` and returns how
    /// many bytes were filled.
    ///
    /// Fewer than `buffer.len()` bytes are filled only when the payload ends
    /// before the buffer does; that is not an error here. Use
    /// [`BlockReader::object_exact`] to reject partial fills.
    #[instrument(skip(self, ctx, buffer), fields(len = buffer.len()))]
    pub async fn object(
        &self,
        ctx: &OpContext,
        block_id: &Uuid,
        tenant_id: &str,
        start: u64,
        buffer: &mut [u8],
    ) -> Result<usize> {
        if buffer.is_empty() {
            return Ok(0);
        }
        let key = BlockKeys::new(tenant_id, block_id).object();
        let len = buffer.len() as u64;
        let stream = ctx
            .run(async {
                self.storage
                    .get_range(&key, start, len)
                    .await
                    .map_err(|e| Error::from_store(&key, e))
            })
            .await?;
        fill_buffer(ctx, &key, stream, buffer).await
    }

    /// Like [`BlockReader::object`], but a partial fill is a
    /// [`Error::ShortRead`].
    pub async fn object_exact(
        &self,
        ctx: &OpContext,
        block_id: &Uuid,
        tenant_id: &str,
        start: u64,
        buffer: &mut [u8],
    ) -> Result<()> {
        let expected = buffer.len();
        let actual = self.object(ctx, block_id, tenant_id, start, buffer).await?;
        if actual != expected {
            return Err(Error::ShortRead {
                key: BlockKeys::new(tenant_id, block_id).object().to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    async fn read_all(&self, ctx: &OpContext, key: &Path) -> Result<Bytes> {
        ctx.run(async {
            self.storage
                .read_bytes(key)
                .await
                .map_err(|e| Error::from_store(key, e))
        })
        .await
    }
}

fn decode_meta(key: &Path, bytes: &[u8]) -> Result<BlockMeta> {
    BlockMeta::from_json(bytes).map_err(|source| Error::MalformedMeta {
        key: key.to_string(),
        source,
    })
}

/// Copies chunks from `stream` into `buffer` until it is full or the stream
/// ends. A chunk shorter than the space left is not an end; an empty chunk
/// is. Returns the number of bytes filled.
pub async fn fill_buffer<S>(
    ctx: &OpContext,
    key: &Path,
    mut stream: S,
    buffer: &mut [u8],
) -> Result<usize>
where
    S: Stream<Item = object_store::Result<Bytes>> + Unpin,
{
    let mut filled = 0;
    while filled < buffer.len() {
        let Some(chunk) = ctx.run(async { Ok(stream.next().await) }).await? else {
            break;
        };
        let chunk = chunk.map_err(|e| Error::from_store(key, e))?;
        if chunk.is_empty() {
            break;
        }
        let n = chunk.len().min(buffer.len() - filled);
        buffer[filled..filled + n].copy_from_slice(&chunk[..n]);
        filled += n;
    }
    Ok(filled)
}
