use object_store::path::Path;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("object not found. key: {}", key)]
    NotFound { key: String },

    #[error("object store request failed. key: {}, error: {}", key, source)]
    Store {
        key: String,
        source: object_store::Error,
    },

    #[error("failed parse on block id {}: {}", value, source)]
    MalformedBlockId { value: String, source: uuid::Error },

    #[error("listed entry has no name. prefix: {}", prefix)]
    MalformedEntry { prefix: String },

    #[error("failed to decode block meta. key: {}, error: {}", key, source)]
    MalformedMeta {
        key: String,
        source: serde_json::Error,
    },

    #[error("failed to encode block meta. error: {}", source)]
    MetaEncode { source: serde_json::Error },

    #[error("payload source not found: {}", location)]
    LocalSourceMissing {
        location: String,
        source: Option<std::io::Error>,
    },

    #[error("failed to read payload source {}: {}", location, source)]
    SourceRead {
        location: String,
        source: std::io::Error,
    },

    #[error(
        "short read on {}: expected {} bytes, got {}",
        key,
        expected,
        actual
    )]
    ShortRead {
        key: String,
        expected: usize,
        actual: usize,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("operation deadline exceeded")]
    DeadlineExceeded,
}

impl Error {
    /// Wraps an object store failure for `key`, surfacing missing objects
    /// as [`Error::NotFound`].
    pub fn from_store(key: &Path, source: object_store::Error) -> Self {
        match source {
            object_store::Error::NotFound { .. } => Self::NotFound {
                key: key.to_string(),
            },
            source => Self::Store {
                key: key.to_string(),
                source,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Failures of a single round trip that a caller-side retry may fix.
    /// This layer never retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store { source, .. } => !matches!(
                source,
                object_store::Error::NotSupported { .. }
                    | object_store::Error::NotImplemented
                    | object_store::Error::InvalidPath { .. }
                    | object_store::Error::PermissionDenied { .. }
                    | object_store::Error::Unauthenticated { .. }
            ),
            Self::DeadlineExceeded => true,
            _ => false,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::MalformedBlockId { .. } | Self::MalformedEntry { .. } | Self::MalformedMeta { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_not_found_is_mapped() {
        let key = Path::from("tenant/block/meta.json");
        let err = Error::from_store(
            &key,
            object_store::Error::NotFound {
                path: key.to_string(),
                source: "missing".into(),
            },
        );
        assert!(err.is_not_found());
        assert!(!err.is_retryable());
        assert_eq!(
            err.to_string(),
            "object not found. key: tenant/block/meta.json"
        );
    }

    #[test]
    fn test_generic_store_errors_are_retryable() {
        let key = Path::from("tenant/block/data");
        let err = Error::from_store(
            &key,
            object_store::Error::Generic {
                store: "S3",
                source: "connection reset".into(),
            },
        );
        assert!(matches!(err, Error::Store { .. }));
        assert!(err.is_retryable());
    }
}
