use anyhow::{Context, Result};
use object_store::gcp::{GoogleCloudStorage, GoogleCloudStorageBuilder};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GcsConfig {
    /// Path to a service account JSON file. Falls back to the
    /// `GOOGLE_*` environment variables when unset.
    pub service_account_path: Option<String>,
}

pub(crate) fn gcs_storage(bucket: &str, gcs: &GcsConfig) -> Result<GoogleCloudStorage> {
    let mut builder = GoogleCloudStorageBuilder::from_env().with_bucket_name(bucket);
    if let Some(path) = &gcs.service_account_path {
        builder = builder.with_service_account_path(path);
    }
    builder.build().context("unable to build GCS client")
}
