use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{validate_key, BlobError, BlobStore, Bucket, StoredBlob};

/// Blob store held in memory; contents are lost on restart.
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<(Bucket, String), StoredBlob>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects across all buckets.
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, bucket: Bucket, key: &str, blob: StoredBlob) -> Result<(), BlobError> {
        validate_key(key)?;
        let mut blobs = self.blobs.write().await;
        blobs.insert((bucket, key.to_string()), blob);
        Ok(())
    }

    async fn get(&self, bucket: Bucket, key: &str) -> Result<Option<StoredBlob>, BlobError> {
        validate_key(key)?;
        let blobs = self.blobs.read().await;
        Ok(blobs.get(&(bucket, key.to_string())).cloned())
    }

    async fn delete(&self, bucket: Bucket, key: &str) -> Result<(), BlobError> {
        validate_key(key)?;
        let mut blobs = self.blobs.write().await;
        blobs.remove(&(bucket, key.to_string()));
        Ok(())
    }
}
