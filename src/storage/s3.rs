//! S3-backed bucket gateway.
//!
//! The `object_store` client is async; this wrapper owns a current-thread
//! runtime and exposes the blocking interface the rest of the pipeline
//! works against.

use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as StorePath;
use object_store::{ObjectStore, PutPayload};
use tokio::runtime::Runtime;
use tracing::info;

use super::ObjectBucket;
use crate::error::{Error, Result};

/// One S3 bucket behind an endpoint.
pub struct S3Bucket {
    store: AmazonS3,
    runtime: Runtime,
    endpoint_url: String,
    bucket: String,
}

impl S3Bucket {
    /// Connects to `bucket` behind `endpoint_url`. Credentials and region
    /// come from the standard AWS environment variables.
    pub fn connect(endpoint_url: &str, bucket: &str) -> Result<Self> {
        let store = AmazonS3Builder::from_env()
            .with_endpoint(endpoint_url)
            .with_bucket_name(bucket)
            .with_allow_http(endpoint_url.starts_with("http://"))
            .build()
            .map_err(Error::Storage)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            store,
            runtime,
            endpoint_url: endpoint_url.to_string(),
            bucket: bucket.to_string(),
        })
    }
}

/// Maps the backend's missing-object case onto the crate's typed variant.
fn map_not_found(key: &str, err: object_store::Error) -> Error {
    match err {
        object_store::Error::NotFound { .. } => Error::NotFound {
            key: key.to_string(),
        },
        other => Error::Storage(other),
    }
}

impl ObjectBucket for S3Bucket {
    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = StorePath::from(prefix);
        self.runtime
            .block_on(
                self.store
                    .list(Some(&prefix))
                    .map_ok(|meta| meta.location.to_string())
                    .try_collect(),
            )
            .map_err(Error::Storage)
    }

    fn get(&self, key: &str) -> Result<Bytes> {
        info!(
            endpoint = %self.endpoint_url,
            bucket = %self.bucket,
            key,
            "reading object"
        );
        let path = StorePath::from(key);
        self.runtime
            .block_on(async {
                let result = self.store.get(&path).await?;
                result.bytes().await
            })
            .map_err(|err| map_not_found(key, err))
    }

    fn put(&self, key: &str, body: Bytes) -> Result<()> {
        info!(
            endpoint = %self.endpoint_url,
            bucket = %self.bucket,
            key,
            bytes = body.len(),
            "writing object"
        );
        let path = StorePath::from(key);
        self.runtime
            .block_on(self.store.put(&path, PutPayload::from(body)))
            .map(|_| ())
            .map_err(Error::Storage)
    }
}
