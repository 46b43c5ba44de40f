use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

pub const CURRENT_VERSION: &str = "v0";

/// Descriptor persisted as `meta.json`, written after every other component
/// of a block. Its presence marks the block as complete.
///
/// Fields this crate does not know about are kept in `extra` so a
/// descriptor written by a newer producer survives a read/write cycle.
/// Missing known fields take their zero value (nil id, empty strings, the
/// Unix epoch).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockMeta {
    #[serde(rename = "format", default)]
    pub version: String,
    #[serde(rename = "blockID", default)]
    pub block_id: Uuid,
    #[serde(rename = "tenantID", default)]
    pub tenant_id: String,
    #[serde(rename = "minID", with = "base64_bytes", default)]
    pub min_id: Vec<u8>,
    #[serde(rename = "maxID", with = "base64_bytes", default)]
    pub max_id: Vec<u8>,
    #[serde(rename = "startTime", default)]
    pub start_time: DateTime<Utc>,
    #[serde(rename = "endTime", default)]
    pub end_time: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl BlockMeta {
    pub fn new(tenant_id: &str, block_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            version: CURRENT_VERSION.to_string(),
            block_id,
            tenant_id: tenant_id.to_string(),
            min_id: Vec::new(),
            max_id: Vec::new(),
            start_time: now,
            end_time: now,
            extra: serde_json::Map::new(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

// Ids are opaque bytes, stored base64 encoded.
mod base64_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = Option::<String>::deserialize(deserializer)?;
        match encoded {
            Some(encoded) => STANDARD
                .decode(encoded.as_bytes())
                .map_err(serde::de::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}
