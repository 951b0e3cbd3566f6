//! Filesystem blob store: one directory per bucket under a root.
//!
//! The content type is not stored; it is derived from the key's extension
//! when the object is read back.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{content_type_for_key, validate_key, BlobError, BlobStore, Bucket, StoredBlob};

pub struct FilesystemBlobStore {
    root: PathBuf,
}

impl FilesystemBlobStore {
    /// Creates the bucket directories under `root` if they don't exist.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, BlobError> {
        let root = root.as_ref().to_path_buf();
        for bucket in [Bucket::MeetingReports, Bucket::OfficerDocuments] {
            std::fs::create_dir_all(root.join(bucket.as_str())).map_err(|source| {
                BlobError::Io {
                    operation: "create bucket directory",
                    source,
                }
            })?;
        }
        Ok(Self { root })
    }

    fn path_for(&self, bucket: Bucket, key: &str) -> Result<PathBuf, BlobError> {
        validate_key(key)?;
        Ok(self.root.join(bucket.as_str()).join(key))
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(&self, bucket: Bucket, key: &str, blob: StoredBlob) -> Result<(), BlobError> {
        let path = self.path_for(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| BlobError::Io {
                    operation: "create blob directory",
                    source,
                })?;
        }
        // Write to a temporary name first so readers never see a partial file.
        let tmp = path.with_extension("partial");
        tokio::fs::write(&tmp, &blob.bytes)
            .await
            .map_err(|source| BlobError::Io {
                operation: "write blob",
                source,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| BlobError::Io {
                operation: "rename blob",
                source,
            })?;
        debug!("Stored {} bytes at {}/{}", blob.bytes.len(), bucket, key);
        Ok(())
    }

    async fn get(&self, bucket: Bucket, key: &str) -> Result<Option<StoredBlob>, BlobError> {
        let path = self.path_for(bucket, key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(StoredBlob {
                content_type: content_type_for_key(key).to_string(),
                bytes,
            })),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(None),
            Err(source) => Err(BlobError::Io {
                operation: "read blob",
                source,
            }),
        }
    }

    async fn delete(&self, bucket: Bucket, key: &str) -> Result<(), BlobError> {
        let path = self.path_for(bucket, key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(source) => Err(BlobError::Io {
                operation: "delete blob",
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_behaviour() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path()).unwrap();
        super::super::tests::exercise_store(&store).await;
        assert!(dir.path().join("meeting-reports").is_dir());
        assert!(dir.path().join("officer-documents").is_dir());
    }

    #[tokio::test]
    async fn test_content_type_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path()).unwrap();
        store
            .put(
                Bucket::OfficerDocuments,
                "req/ktp.jpg",
                StoredBlob {
                    content_type: "image/jpeg".into(),
                    bytes: vec![0xff, 0xd8],
                },
            )
            .await
            .unwrap();
        let blob = store
            .get(Bucket::OfficerDocuments, "req/ktp.jpg")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(blob.content_type, "image/jpeg");
        assert_eq!(blob.bytes, vec![0xff, 0xd8]);
    }
}
