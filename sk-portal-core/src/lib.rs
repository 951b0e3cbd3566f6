pub mod document;
pub mod error;
pub mod quota;
pub mod roster;
pub mod structure;
pub mod workflow;

pub use document::{DocumentKind, DocumentUpload};
pub use error::{ErrorKind, TransitionError, ValidationError};
pub use quota::{
    ensure_quota, is_quota_met, officers_needed_for_quota, Gender, Gendered, QuotaCount,
    QuotaSummary,
};
pub use roster::{DocumentSource, Officer, OfficerDetails, RosterDraft, StagedOfficer};
pub use structure::{available_titles, is_title_allowed, Bureau, CustomTitle, StructureCategory};
pub use workflow::*;
