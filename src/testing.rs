use std::sync::Arc;

use blob_store::BlobStorage;
use bytes::Bytes;
use object_store::{memory::InMemory, path::Path};
use uuid::Uuid;

use crate::{
    backend::Backend,
    config::BackendConfig,
    context::OpContext,
    error::Result,
    meta::BlockMeta,
    source::BytesSource,
};

/// A backend over an in-memory store, with direct access to the store for
/// setting up and inspecting raw keys.
pub struct TestBackend {
    pub backend: Backend,
    pub storage: BlobStorage,
}

impl TestBackend {
    pub fn new(chunk_buffer_size: usize) -> Self {
        let storage = BlobStorage::with_object_store(Arc::new(InMemory::new()), chunk_buffer_size);
        let backend = Backend::with_storage(storage.clone(), &BackendConfig::default());
        Self { backend, storage }
    }

    pub async fn write_block(
        &self,
        tenant_id: &str,
        block_id: &Uuid,
        bloom: &[u8],
        index: &[u8],
        data: &[u8],
    ) -> Result<BlockMeta> {
        let meta = BlockMeta::new(tenant_id, *block_id);
        self.backend
            .write(
                &OpContext::new(),
                tenant_id,
                block_id,
                &meta,
                Bytes::copy_from_slice(bloom),
                Bytes::copy_from_slice(index),
                &BytesSource::new(Bytes::copy_from_slice(data)),
            )
            .await?;
        Ok(meta)
    }

    pub async fn raw(&self, key: &Path) -> anyhow::Result<Bytes> {
        Ok(self.storage.read_bytes(key).await?)
    }
}
