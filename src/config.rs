use std::time::Duration;

use anyhow::Result;
use blob_store::BlobStorageConfig;
use figment::{
    providers::{Format, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::tracing::TracingConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendConfig {
    pub blob_storage: BlobStorageConfig,
    /// Deadline applied to contexts created by `Backend::context`.
    #[serde(default)]
    pub operation_timeout_secs: Option<u64>,
    /// Report a block from `blocks` only once its meta exists.
    #[serde(default)]
    pub require_meta_for_listing: bool,
    #[serde(default)]
    pub tracing: TracingConfig,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            blob_storage: BlobStorageConfig::memory("blocks"),
            operation_timeout_secs: None,
            require_meta_for_listing: false,
            tracing: TracingConfig::default(),
        }
    }
}

impl BackendConfig {
    pub fn from_path(path: &str) -> Result<BackendConfig> {
        let config_str = std::fs::read_to_string(path)?;
        Self::from_yaml(&config_str)
    }

    pub fn from_yaml(config_str: &str) -> Result<BackendConfig> {
        let config: BackendConfig = Figment::new().merge(Yaml::string(config_str)).extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.blob_storage.validate()?;
        if self.operation_timeout_secs == Some(0) {
            return Err(anyhow::anyhow!(
                "operation_timeout_secs must be greater than zero"
            ));
        }
        Ok(())
    }

    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_secs.map(Duration::from_secs)
    }
}
