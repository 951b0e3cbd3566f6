//! Blob storage for uploaded documents.
//!
//! Documents live in two buckets. Keys are generated by the service and are
//! never taken from user input, but backends still reject keys that could
//! escape their bucket.

mod fs;
mod memory;
pub mod signer;

pub use fs::FilesystemBlobStore;
pub use memory::InMemoryBlobStore;
pub use signer::{SignatureError, SignedUrl, UrlSigner};

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sk_portal_core::{DocumentUpload, ErrorKind, ProfileId, RequestId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Bucket {
    MeetingReports,
    OfficerDocuments,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MeetingReports => "meeting-reports",
            Self::OfficerDocuments => "officer-documents",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bucket {
    type Err = BlobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "meeting-reports" => Ok(Self::MeetingReports),
            "officer-documents" => Ok(Self::OfficerDocuments),
            other => Err(BlobError::UnknownBucket {
                bucket: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("unknown bucket {bucket}")]
    UnknownBucket { bucket: String },

    #[error("invalid blob key {key:?}")]
    InvalidKey { key: String },

    #[error("blob {bucket}/{key} not found")]
    NotFound { bucket: Bucket, key: String },

    #[error("blob storage error during {operation}: {source}")]
    Io {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl BlobError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownBucket { .. } | Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidKey { .. } => ErrorKind::Validation,
            Self::Io { .. } => ErrorKind::Upstream,
        }
    }
}

/// Bytes and content type of a stored object.
#[derive(Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for StoredBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredBlob")
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store an object, replacing any existing object with the same key.
    async fn put(&self, bucket: Bucket, key: &str, blob: StoredBlob) -> Result<(), BlobError>;

    async fn get(&self, bucket: Bucket, key: &str) -> Result<Option<StoredBlob>, BlobError>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, bucket: Bucket, key: &str) -> Result<(), BlobError>;
}

/// Rejects keys that are empty, absolute, or contain `..` segments or
/// characters outside `[A-Za-z0-9._/-]`.
pub fn validate_key(key: &str) -> Result<(), BlobError> {
    let valid = !key.is_empty()
        && !key.starts_with('/')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '/' | '-'))
        && key.split('/').all(|seg| !seg.is_empty() && seg != "." && seg != "..");
    if valid {
        Ok(())
    } else {
        Err(BlobError::InvalidKey {
            key: key.to_string(),
        })
    }
}

/// Content type to serve for a key, from its extension.
pub fn content_type_for_key(key: &str) -> &'static str {
    match key.rsplit('.').next() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Key for a chapter's meeting report.
pub fn meeting_report_key(chapter: ProfileId, upload: &DocumentUpload) -> String {
    format!("{}/{}.{}", chapter, Uuid::new_v4(), upload.extension())
}

/// Key for an officer's identity document.
pub fn officer_document_key(request: RequestId, upload: &DocumentUpload) -> String {
    format!("{}/{}.{}", request, Uuid::new_v4(), upload.extension())
}

impl From<DocumentUpload> for StoredBlob {
    fn from(upload: DocumentUpload) -> Self {
        Self {
            content_type: upload.content_type.trim().to_ascii_lowercase(),
            bytes: upload.bytes,
        }
    }
}
