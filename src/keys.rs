use object_store::path::Path;
use percent_encoding::percent_decode_str;
use uuid::Uuid;

pub const META_NAME: &str = "meta.json";
pub const BLOOM_NAME: &str = "bloom";
pub const INDEX_NAME: &str = "index";
pub const OBJECT_NAME: &str = "data";

/// Store keys of one block, all below `<tenant-id>/<block-id>`.
///
/// Neither id may contain the path delimiter; this is not checked here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockKeys {
    root: Path,
}

impl BlockKeys {
    pub fn new(tenant_id: &str, block_id: &Uuid) -> Self {
        Self {
            root: tenant_prefix(tenant_id).child(block_id.to_string()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn meta(&self) -> Path {
        self.root.child(META_NAME)
    }

    pub fn bloom(&self) -> Path {
        self.root.child(BLOOM_NAME)
    }

    pub fn index(&self) -> Path {
        self.root.child(INDEX_NAME)
    }

    pub fn object(&self) -> Path {
        self.root.child(OBJECT_NAME)
    }
}

pub fn tenant_prefix(tenant_id: &str) -> Path {
    Path::from_iter([tenant_id])
}

/// Turns a listed key segment back into the id it was built from.
///
/// Segments are percent-encoded when a key is built, so `acme|prod` is stored
/// as `acme%7Cprod`. Returns `None` when the decoded bytes are not UTF-8.
pub fn decode_segment(segment: &str) -> Option<String> {
    percent_decode_str(segment)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_keys() {
        let block_id = Uuid::parse_str("6f2a4a60-3c9b-4f86-9a34-3a2b8f0f6a11").unwrap();
        let keys = BlockKeys::new("single-tenant", &block_id);

        let root = "single-tenant/6f2a4a60-3c9b-4f86-9a34-3a2b8f0f6a11";
        assert_eq!(keys.root().to_string(), root);
        assert_eq!(keys.meta().to_string(), format!("{root}/meta.json"));
        assert_eq!(keys.bloom().to_string(), format!("{root}/bloom"));
        assert_eq!(keys.index().to_string(), format!("{root}/index"));
        assert_eq!(keys.object().to_string(), format!("{root}/data"));
    }

    #[test]
    fn test_segments_decode_to_ids() {
        let prefix = tenant_prefix("acme|prod");
        assert_eq!(prefix.to_string(), "acme%7Cprod");
        let segment = prefix.filename().unwrap();
        assert_eq!(decode_segment(segment).as_deref(), Some("acme|prod"));

        assert_eq!(decode_segment("plain-tenant").as_deref(), Some("plain-tenant"));
        assert_eq!(decode_segment("%FF"), None);
    }

    #[test]
    fn test_keys_are_deterministic() {
        let block_id = Uuid::new_v4();
        assert_eq!(
            BlockKeys::new("tenant", &block_id),
            BlockKeys::new("tenant", &block_id)
        );
        assert_ne!(
            BlockKeys::new("tenant", &block_id).root(),
            BlockKeys::new("other", &block_id).root()
        );
    }
}
