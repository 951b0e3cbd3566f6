//! Upload rules for the two kinds of documents a filing carries.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Report of the regional deliberative meeting. PDF only.
    MeetingReport,
    /// Scan of an officer's identity card.
    IdentityDocument,
}

impl DocumentKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MeetingReport => "meeting report",
            Self::IdentityDocument => "identity document",
        }
    }

    pub fn allowed_content_types(&self) -> &'static [&'static str] {
        match self {
            Self::MeetingReport => &["application/pdf"],
            Self::IdentityDocument => &["image/jpeg", "image/png", "application/pdf"],
        }
    }

    fn allowed_description(&self) -> &'static str {
        match self {
            Self::MeetingReport => "PDF",
            Self::IdentityDocument => "JPG, PNG, PDF",
        }
    }

    pub fn max_size_mib(&self) -> u64 {
        match self {
            Self::MeetingReport => 10,
            Self::IdentityDocument => 5,
        }
    }
}

/// A document supplied by the filer that has not been stored yet.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for DocumentUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl DocumentUpload {
    /// Checks content type and size against the rules for `kind`.
    pub fn validate(&self, kind: DocumentKind) -> Result<(), ValidationError> {
        if self.bytes.is_empty() {
            return Err(ValidationError::MissingField { field: kind.name() });
        }
        let content_type = self.content_type.trim().to_ascii_lowercase();
        if !kind.allowed_content_types().contains(&content_type.as_str()) {
            return Err(ValidationError::UnsupportedFileType {
                document: kind.name(),
                allowed: kind.allowed_description(),
            });
        }
        if self.bytes.len() as u64 > kind.max_size_mib() * MIB {
            return Err(ValidationError::FileTooLarge {
                document: kind.name(),
                limit_mib: kind.max_size_mib(),
            });
        }
        Ok(())
    }

    /// File extension to use for the stored object.
    pub fn extension(&self) -> &'static str {
        match self.content_type.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            _ => "pdf",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(content_type: &str, len: usize) -> DocumentUpload {
        DocumentUpload {
            file_name: "scan".into(),
            content_type: content_type.into(),
            bytes: vec![0u8; len],
        }
    }

    #[test]
    fn test_meeting_report_must_be_pdf() {
        assert!(upload("application/pdf", 10)
            .validate(DocumentKind::MeetingReport)
            .is_ok());
        assert_eq!(
            upload("image/png", 10).validate(DocumentKind::MeetingReport),
            Err(ValidationError::UnsupportedFileType {
                document: "meeting report",
                allowed: "PDF",
            })
        );
    }

    #[test]
    fn test_identity_document_size_limit() {
        let limit = 5 * 1024 * 1024;
        assert!(upload("image/jpeg", limit)
            .validate(DocumentKind::IdentityDocument)
            .is_ok());
        assert_eq!(
            upload("image/jpeg", limit + 1).validate(DocumentKind::IdentityDocument),
            Err(ValidationError::FileTooLarge {
                document: "identity document",
                limit_mib: 5,
            })
        );
    }

    #[test]
    fn test_empty_upload_is_missing() {
        assert!(matches!(
            upload("application/pdf", 0).validate(DocumentKind::MeetingReport),
            Err(ValidationError::MissingField { .. })
        ));
    }

    #[test]
    fn test_extension_follows_content_type() {
        assert_eq!(upload("IMAGE/PNG", 1).extension(), "png");
        assert_eq!(upload("image/jpeg", 1).extension(), "jpg");
        assert_eq!(upload("application/pdf", 1).extension(), "pdf");
    }
}
