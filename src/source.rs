use std::{io, path::PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncRead;

pub type PayloadReader = Box<dyn AsyncRead + Send + Unpin>;

/// A readable byte stream holding the full object payload of a block.
///
/// The payload is streamed into the store, never buffered whole.
#[async_trait]
pub trait PayloadSource: Send + Sync {
    /// Human readable location, used in errors and logs.
    fn location(&self) -> String;

    async fn exists(&self) -> bool;

    async fn open(&self) -> io::Result<PayloadReader>;
}

/// Payload held in a local file.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PayloadSource for FileSource {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    async fn exists(&self) -> bool {
        tokio::fs::try_exists(&self.path).await.unwrap_or(false)
    }

    async fn open(&self) -> io::Result<PayloadReader> {
        let file = tokio::fs::File::open(&self.path).await?;
        Ok(Box::new(file))
    }
}

/// Payload already in memory.
#[derive(Debug, Clone)]
pub struct BytesSource {
    data: Bytes,
}

impl BytesSource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }
}

#[async_trait]
impl PayloadSource for BytesSource {
    fn location(&self) -> String {
        format!("memory ({} bytes)", self.data.len())
    }

    async fn exists(&self) -> bool {
        true
    }

    async fn open(&self) -> io::Result<PayloadReader> {
        Ok(Box::new(io::Cursor::new(self.data.clone())))
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;

    #[tokio::test]
    async fn test_file_source() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("data");
        let source = FileSource::new(&path);
        assert!(!source.exists().await);
        assert!(source.open().await.is_err());

        tokio::fs::write(&path, b"payload").await?;
        assert!(source.exists().await);
        let mut contents = Vec::new();
        source.open().await?.read_to_end(&mut contents).await?;
        assert_eq!(contents, b"payload");
        Ok(())
    }

    #[tokio::test]
    async fn test_bytes_source() -> anyhow::Result<()> {
        let source = BytesSource::new(Bytes::from_static(b"payload"));
        assert!(source.exists().await);
        let mut contents = Vec::new();
        source.open().await?.read_to_end(&mut contents).await?;
        assert_eq!(contents, b"payload");
        Ok(())
    }
}
