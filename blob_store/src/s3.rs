use std::env;

use anyhow::{Context, Result};
use object_store::aws::{AmazonS3, AmazonS3Builder};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct S3Config {
    pub region: Option<String>,
    pub endpoint: Option<String>,
}

pub(crate) fn s3_storage(bucket: &str, s3: &S3Config) -> Result<AmazonS3> {
    let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
    if let Some(region) = &s3.region {
        builder = builder.with_region(region);
    }

    // For supporting localstack/minio for testing
    let endpoint = s3.endpoint.clone().or_else(|| env::var("AWS_ENDPOINT_URL").ok());
    if let Some(endpoint) = endpoint {
        if endpoint.starts_with("http://") {
            builder = builder.with_allow_http(true);
        }
        builder = builder.with_endpoint(endpoint);
    }

    builder.build().context("unable to build S3 client")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_with_local_endpoint() {
        let config = S3Config {
            region: Some("us-east-1".to_string()),
            endpoint: Some("http://localhost:4566".to_string()),
        };
        assert!(s3_storage("test-bucket", &config).is_ok());
    }
}
