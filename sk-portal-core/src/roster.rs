//! Officer roster: persisted officers and the staging buffer the filer edits
//! before committing.
//!
//! Nothing in a [`RosterDraft`] is stored until the server commits the whole
//! draft. Positions are renumbered after every edit so they always run
//! `0..len` in display order.

use serde::{Deserialize, Serialize};

use crate::document::{DocumentKind, DocumentUpload};
use crate::error::ValidationError;
use crate::quota::{ensure_quota, Gender, Gendered, QuotaSummary};
use crate::structure::{is_title_allowed, Bureau, CustomTitle, StructureCategory};
use crate::workflow::RequestId;

/// The fields a filer enters for one officer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfficerDetails {
    pub structure: StructureCategory,
    /// Only set for [`StructureCategory::Bureaus`].
    pub bureau: Option<Bureau>,
    pub title: String,
    pub full_name: String,
    pub gender: Gender,
}

impl OfficerDetails {
    /// Checks required fields, the bureau rule and the title list.
    pub fn validate(&self, custom: &[CustomTitle]) -> Result<(), ValidationError> {
        if self.full_name.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "full name" });
        }
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "title" });
        }
        match (self.structure.requires_bureau(), self.bureau) {
            (true, None) => {
                return Err(ValidationError::MissingBureau {
                    structure: self.structure,
                })
            }
            (false, Some(_)) => {
                return Err(ValidationError::UnexpectedBureau {
                    structure: self.structure,
                })
            }
            _ => {}
        }
        if !is_title_allowed(self.structure, &self.title, custom) {
            return Err(ValidationError::UnknownTitle {
                structure: self.structure,
                title: self.title.trim().to_string(),
            });
        }
        Ok(())
    }

    fn normalized(mut self) -> Self {
        self.full_name = self.full_name.trim().to_string();
        self.title = self.title.trim().to_string();
        self
    }
}

/// A persisted officer row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Officer {
    pub request_id: RequestId,
    #[serde(flatten)]
    pub details: OfficerDetails,
    /// Blob key of the identity document.
    pub id_document: String,
    /// Ordering index, unique within the request.
    pub position: u32,
}

impl Gendered for Officer {
    fn gender(&self) -> Gender {
        self.details.gender
    }
}

/// Where a staged officer's identity document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// Already in the blob store from an earlier submission.
    Stored(String),
    /// Supplied with this submission; uploaded when the roster is committed.
    Pending(DocumentUpload),
}

impl DocumentSource {
    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Stored(key) if key.trim().is_empty() => Err(ValidationError::MissingField {
                field: "identity document",
            }),
            Self::Stored(_) => Ok(()),
            Self::Pending(upload) => upload.validate(DocumentKind::IdentityDocument),
        }
    }
}

/// An officer in the staging buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedOfficer {
    pub details: OfficerDetails,
    pub document: DocumentSource,
    pub position: usize,
}

impl Gendered for StagedOfficer {
    fn gender(&self) -> Gender {
        self.details.gender
    }
}

impl StagedOfficer {
    /// Builds the row to persist once the document has a blob key.
    pub fn into_officer(self, request_id: RequestId, id_document: String) -> Officer {
        Officer {
            request_id,
            details: self.details,
            id_document,
            position: u32::try_from(self.position).unwrap_or(u32::MAX),
        }
    }
}

/// Owned staging buffer for a roster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterDraft {
    officers: Vec<StagedOfficer>,
}

impl RosterDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a persisted roster for editing, e.g. after a rejection.
    pub fn from_persisted(mut officers: Vec<Officer>) -> Self {
        officers.sort_by_key(|o| o.position);
        let mut draft = Self {
            officers: officers
                .into_iter()
                .map(|o| StagedOfficer {
                    details: o.details,
                    document: DocumentSource::Stored(o.id_document),
                    position: 0,
                })
                .collect(),
        };
        draft.renumber();
        draft
    }

    pub fn len(&self) -> usize {
        self.officers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.officers.is_empty()
    }

    pub fn officers(&self) -> &[StagedOfficer] {
        &self.officers
    }

    pub fn into_officers(self) -> Vec<StagedOfficer> {
        self.officers
    }

    pub fn quota(&self) -> QuotaSummary {
        QuotaSummary::of(&self.officers)
    }

    /// Appends an officer and returns its position.
    pub fn add(
        &mut self,
        details: OfficerDetails,
        document: DocumentSource,
        custom: &[CustomTitle],
    ) -> Result<usize, ValidationError> {
        details.validate(custom)?;
        document.validate()?;
        let position = self.officers.len();
        self.officers.push(StagedOfficer {
            details: details.normalized(),
            document,
            position,
        });
        Ok(position)
    }

    /// Replaces the officer at `position`, keeping its place in the order.
    pub fn replace(
        &mut self,
        position: usize,
        details: OfficerDetails,
        document: DocumentSource,
        custom: &[CustomTitle],
    ) -> Result<(), ValidationError> {
        self.check_position(position)?;
        details.validate(custom)?;
        document.validate()?;
        self.officers[position] = StagedOfficer {
            details: details.normalized(),
            document,
            position,
        };
        Ok(())
    }

    pub fn remove(&mut self, position: usize) -> Result<StagedOfficer, ValidationError> {
        self.check_position(position)?;
        let removed = self.officers.remove(position);
        self.renumber();
        Ok(removed)
    }

    pub fn move_up(&mut self, position: usize) -> Result<(), ValidationError> {
        self.check_position(position)?;
        if position > 0 {
            self.officers.swap(position - 1, position);
            self.renumber();
        }
        Ok(())
    }

    pub fn move_down(&mut self, position: usize) -> Result<(), ValidationError> {
        self.check_position(position)?;
        if position + 1 < self.officers.len() {
            self.officers.swap(position, position + 1);
            self.renumber();
        }
        Ok(())
    }

    /// Everything the submission gate checks about the roster itself.
    pub fn validate_for_submission(&self, custom: &[CustomTitle]) -> Result<(), ValidationError> {
        if self.officers.is_empty() {
            return Err(ValidationError::EmptyRoster);
        }
        for officer in &self.officers {
            officer
                .details
                .validate(custom)
                .and_then(|_| officer.document.validate())
                .map_err(|e| e.for_officer(officer.position))?;
        }
        ensure_quota(&self.officers)
    }

    fn check_position(&self, position: usize) -> Result<(), ValidationError> {
        if position < self.officers.len() {
            Ok(())
        } else {
            Err(ValidationError::PositionOutOfRange { position })
        }
    }

    fn renumber(&mut self) {
        for (index, officer) in self.officers.iter_mut().enumerate() {
            officer.position = index;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(title: &str, name: &str, gender: Gender) -> OfficerDetails {
        OfficerDetails {
            structure: StructureCategory::AdvisoryBoard,
            bureau: None,
            title: title.into(),
            full_name: name.into(),
            gender,
        }
    }

    fn stored(key: &str) -> DocumentSource {
        DocumentSource::Stored(key.into())
    }

    fn names(draft: &RosterDraft) -> Vec<&str> {
        draft
            .officers()
            .iter()
            .map(|o| o.details.full_name.as_str())
            .collect()
    }

    fn positions(draft: &RosterDraft) -> Vec<usize> {
        draft.officers().iter().map(|o| o.position).collect()
    }

    #[test]
    fn test_add_trims_and_positions() {
        let mut draft = RosterDraft::new();
        let pos = draft
            .add(details(" Ketua ", " Siti ", Gender::Female), stored("k1"), &[])
            .unwrap();
        assert_eq!(pos, 0);
        assert_eq!(draft.officers()[0].details.full_name, "Siti");
        assert_eq!(draft.officers()[0].details.title, "Ketua");
    }

    #[test]
    fn test_remove_and_reorder_keep_positions_contiguous() {
        let mut draft = RosterDraft::new();
        for (name, gender) in [("A", Gender::Male), ("B", Gender::Female), ("C", Gender::Male)] {
            draft
                .add(details("Anggota 1", name, gender), stored(name), &[])
                .unwrap();
        }

        draft.move_up(2).unwrap();
        assert_eq!(names(&draft), vec!["A", "C", "B"]);
        draft.move_down(0).unwrap();
        assert_eq!(names(&draft), vec!["C", "A", "B"]);
        // Moving past the ends is a no-op.
        draft.move_up(0).unwrap();
        draft.move_down(2).unwrap();
        assert_eq!(names(&draft), vec!["C", "A", "B"]);

        let removed = draft.remove(1).unwrap();
        assert_eq!(removed.details.full_name, "A");
        assert_eq!(names(&draft), vec!["C", "B"]);
        assert_eq!(positions(&draft), vec![0, 1]);

        assert_eq!(
            draft.remove(5),
            Err(ValidationError::PositionOutOfRange { position: 5 })
        );
    }

    #[test]
    fn test_bureau_rules() {
        let mut officer = details("Ketua", "Rina", Gender::Female);
        officer.structure = StructureCategory::Bureaus;
        assert_eq!(
            officer.validate(&[]),
            Err(ValidationError::MissingBureau {
                structure: StructureCategory::Bureaus
            })
        );
        officer.bureau = Some(Bureau::WomenChildren);
        assert!(officer.validate(&[]).is_ok());

        let mut board = details("Ketua", "Budi", Gender::Male);
        board.bureau = Some(Bureau::Environment);
        assert!(matches!(
            board.validate(&[]),
            Err(ValidationError::UnexpectedBureau { .. })
        ));
    }

    #[test]
    fn test_unknown_title_rejected_unless_custom() {
        let officer = details("Anggota 3", "Dewi", Gender::Female);
        assert!(matches!(
            officer.validate(&[]),
            Err(ValidationError::UnknownTitle { .. })
        ));
        let custom = vec![CustomTitle {
            structure: StructureCategory::AdvisoryBoard,
            title: "Anggota 3".into(),
        }];
        assert!(officer.validate(&custom).is_ok());
    }

    #[test]
    fn test_submission_gate_checks_quota() {
        let mut draft = RosterDraft::new();
        assert_eq!(
            draft.validate_for_submission(&[]),
            Err(ValidationError::EmptyRoster)
        );
        for i in 0..4 {
            draft
                .add(details("Anggota 1", &format!("M{}", i), Gender::Male), stored("k"), &[])
                .unwrap();
        }
        draft
            .add(details("Ketua", "F", Gender::Female), stored("k"), &[])
            .unwrap();
        // 1 of 5 is 20%; (1 + 1) / 6 is 33%
        assert_eq!(
            draft.validate_for_submission(&[]),
            Err(ValidationError::QuotaNotMet {
                female: 1,
                total: 5,
                shortfall: 1,
            })
        );
        draft
            .add(details("Sekretaris", "G", Gender::Female), stored("k"), &[])
            .unwrap();
        assert!(draft.validate_for_submission(&[]).is_ok());
        assert!(draft.quota().met);
    }

    #[test]
    fn test_pending_document_validated_on_add() {
        let mut draft = RosterDraft::new();
        let upload = DocumentUpload {
            file_name: "ktp.gif".into(),
            content_type: "image/gif".into(),
            bytes: vec![1, 2, 3],
        };
        let err = draft
            .add(
                details("Ketua", "Ani", Gender::Female),
                DocumentSource::Pending(upload),
                &[],
            )
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedFileType { .. }));
        assert!(draft.is_empty());
    }

    #[test]
    fn test_from_persisted_sorts_by_position() {
        let request_id = RequestId::new();
        let officer = |name: &str, position: u32| Officer {
            request_id,
            details: details("Anggota 1", name, Gender::Male),
            id_document: format!("{}.pdf", name),
            position,
        };
        let draft = RosterDraft::from_persisted(vec![officer("second", 1), officer("first", 0)]);
        assert_eq!(names(&draft), vec!["first", "second"]);
        assert_eq!(
            draft.officers()[0].document,
            DocumentSource::Stored("first.pdf".into())
        );
    }
}
