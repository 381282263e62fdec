//! Byte-level gateway to S3-compatible object storage.

pub mod memory;
pub mod s3;

pub use memory::MemoryBucket;
pub use s3::S3Bucket;

use bytes::Bytes;

use crate::error::Result;

/// Narrow contract against one object bucket.
///
/// Listing a prefix nothing matches yields an empty vec, not an error.
/// `get` of an absent key fails with [`Error::NotFound`](crate::Error::NotFound);
/// callers for which absence is a valid state match on it explicitly.
pub trait ObjectBucket: Send + Sync {
    /// All keys starting with `prefix`.
    fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Full contents of the object at `key`.
    fn get(&self, key: &str) -> Result<Bytes>;

    /// Writes `body` at `key`, replacing any existing object.
    fn put(&self, key: &str, body: Bytes) -> Result<()>;
}
