use std::path::PathBuf;

use anyhow::Result;
use object_store::local::LocalFileSystem;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiskStorageConfig {
    pub path: String,
}

/// The bucket maps to a directory below `disk.path`.
pub(crate) fn file_storage(bucket: &str, disk: &DiskStorageConfig) -> Result<LocalFileSystem> {
    let root = PathBuf::from(&disk.path).join(bucket);
    std::fs::create_dir_all(&root)?;
    let s = LocalFileSystem::new_with_prefix(root)?;
    Ok(s)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use object_store::path::Path;
    use tempfile::tempdir;

    use crate::{BlobStorage, BlobStorageConfig};

    #[tokio::test]
    async fn test_disk_storage_roots_bucket_under_path() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let config = BlobStorageConfig::disk("traces", dir.path().to_str().unwrap());
        let storage = BlobStorage::new(&config)?;

        storage
            .put(&Path::from("tenant/block/index"), Bytes::from_static(b"index"))
            .await?;

        let on_disk = std::fs::read(dir.path().join("traces/tenant/block/index"))?;
        assert_eq!(on_disk, b"index");

        let tenants = storage.list_dirs(None).await?;
        assert_eq!(tenants, vec![Path::from("tenant")]);
        Ok(())
    }
}
