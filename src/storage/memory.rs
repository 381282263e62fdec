//! In-memory bucket, used by tests in place of a real S3 endpoint.

use std::collections::BTreeMap;
use std::sync::RwLock;

use bytes::Bytes;

use super::ObjectBucket;
use crate::error::{Error, Result};

/// In-memory [`ObjectBucket`]. Keys come back from `list` in sorted order
/// so tests stay deterministic.
#[derive(Debug, Default)]
pub struct MemoryBucket {
    objects: RwLock<BTreeMap<String, Bytes>>,
}

impl MemoryBucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().expect("bucket lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectBucket for MemoryBucket {
    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let objects = self.objects.read().expect("bucket lock poisoned");
        Ok(objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn get(&self, key: &str) -> Result<Bytes> {
        self.objects
            .read()
            .expect("bucket lock poisoned")
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                key: key.to_string(),
            })
    }

    fn put(&self, key: &str, body: Bytes) -> Result<()> {
        self.objects
            .write()
            .expect("bucket lock poisoned")
            .insert(key.to_string(), body);
        Ok(())
    }
}
