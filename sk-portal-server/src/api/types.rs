//! Request and response bodies of the JSON API.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::PortalError;
use sk_portal_core::{
    CustomTitle, Decision, DocumentSource, DocumentUpload, MeetingDetails, OfficerDetails,
    RosterDraft, StructureCategory,
};

/// A file carried inline as base64.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadBody {
    pub file_name: String,
    pub content_type: String,
    pub data_base64: String,
}

impl UploadBody {
    pub fn decode(self) -> Result<DocumentUpload, PortalError> {
        let bytes = STANDARD.decode(self.data_base64.trim()).map_err(|e| {
            PortalError::BadRequest(format!("{} is not valid base64: {}", self.file_name, e))
        })?;
        Ok(DocumentUpload {
            file_name: self.file_name,
            content_type: self.content_type,
            bytes,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct MeetingReportBody {
    pub meeting_date: NaiveDate,
    pub meeting_location: String,
    /// Omit to keep the report already on file.
    #[serde(default)]
    pub report: Option<UploadBody>,
}

impl MeetingReportBody {
    pub fn into_parts(self) -> Result<(MeetingDetails, Option<DocumentUpload>), PortalError> {
        let upload = self.report.map(UploadBody::decode).transpose()?;
        Ok((
            MeetingDetails {
                date: self.meeting_date,
                location: self.meeting_location,
            },
            upload,
        ))
    }
}

/// Identity document of one officer: a key from the previous submission or a
/// new file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentBody {
    Stored { key: String },
    Upload(UploadBody),
}

#[derive(Debug, Deserialize)]
pub struct OfficerBody {
    #[serde(flatten)]
    pub details: OfficerDetails,
    pub document: DocumentBody,
}

#[derive(Debug, Deserialize)]
pub struct RosterBody {
    pub expected_version: u64,
    pub officers: Vec<OfficerBody>,
}

impl RosterBody {
    /// Builds the staging buffer in the order given. Errors carry the
    /// position of the offending officer.
    pub fn into_draft(self, custom: &[CustomTitle]) -> Result<RosterDraft, PortalError> {
        let mut draft = RosterDraft::new();
        for (position, officer) in self.officers.into_iter().enumerate() {
            let document = match officer.document {
                DocumentBody::Stored { key } => DocumentSource::Stored(key),
                DocumentBody::Upload(upload) => DocumentSource::Pending(upload.decode()?),
            };
            draft
                .add(officer.details, document, custom)
                .map_err(|e| e.for_officer(position))?;
        }
        Ok(draft)
    }
}

#[derive(Debug, Deserialize)]
pub struct DecisionBody {
    pub decision: Decision,
    #[serde(default)]
    pub note: Option<String>,
    pub expected_version: u64,
}

#[derive(Debug, Deserialize)]
pub struct TitleQuery {
    pub structure: StructureCategory,
}

#[derive(Debug, Serialize)]
pub struct TitleList {
    pub structure: StructureCategory,
    pub titles: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewTitleBody {
    pub structure: StructureCategory,
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct BlobQuery {
    pub expires: i64,
    pub signature: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sk_portal_core::{Gender, ValidationError};

    fn encoded(bytes: &[u8]) -> String {
        STANDARD.encode(bytes)
    }

    #[test]
    fn test_roster_body_builds_draft_in_order() {
        let body: RosterBody = serde_json::from_value(json!({
            "expected_version": 3,
            "officers": [
                {
                    "structure": "executive_board",
                    "bureau": null,
                    "title": "Ketua DPD",
                    "full_name": "Budi",
                    "gender": "male",
                    "document": { "stored": { "key": "req/ktp-1.jpg" } }
                },
                {
                    "structure": "bureaus",
                    "bureau": "women_children",
                    "title": "Ketua",
                    "full_name": "Siti",
                    "gender": "female",
                    "document": { "upload": {
                        "file_name": "ktp.png",
                        "content_type": "image/png",
                        "data_base64": encoded(b"\x89PNG")
                    } }
                }
            ]
        }))
        .unwrap();
        assert_eq!(body.expected_version, 3);

        let draft = body.into_draft(&[]).unwrap();
        assert_eq!(draft.len(), 2);
        let officers = draft.officers();
        assert_eq!(
            officers[0].document,
            DocumentSource::Stored("req/ktp-1.jpg".into())
        );
        assert_eq!(officers[1].details.gender, Gender::Female);
        match &officers[1].document {
            DocumentSource::Pending(upload) => assert_eq!(upload.bytes, b"\x89PNG"),
            other => panic!("expected pending upload, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_officer_reports_position() {
        let body: RosterBody = serde_json::from_value(json!({
            "expected_version": 1,
            "officers": [
                {
                    "structure": "executive_board",
                    "title": "Ketua DPD",
                    "full_name": "Budi",
                    "gender": "male",
                    "document": { "stored": { "key": "a.jpg" } }
                },
                {
                    "structure": "bureaus",
                    "title": "Ketua",
                    "full_name": "Siti",
                    "gender": "female",
                    "document": { "stored": { "key": "b.jpg" } }
                }
            ]
        }))
        .unwrap();
        let err = body.into_draft(&[]).unwrap_err();
        assert!(matches!(
            err,
            PortalError::Validation(ValidationError::Officer { position: 1, .. })
        ));
    }

    #[test]
    fn test_bad_base64_is_rejected() {
        let upload = UploadBody {
            file_name: "notulen.pdf".into(),
            content_type: "application/pdf".into(),
            data_base64: "not base64!".into(),
        };
        assert!(matches!(upload.decode(), Err(PortalError::BadRequest(_))));
    }

    #[test]
    fn test_meeting_report_without_upload() {
        let body: MeetingReportBody = serde_json::from_value(json!({
            "meeting_date": "2024-04-20",
            "meeting_location": "Gedung Sate"
        }))
        .unwrap();
        let (meeting, upload) = body.into_parts().unwrap();
        assert_eq!(meeting.location, "Gedung Sate");
        assert!(upload.is_none());
    }
}
