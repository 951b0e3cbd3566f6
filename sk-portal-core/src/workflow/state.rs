//! State types for the SK request workflow.
//!
//! A request's lifecycle is a closed set of statuses. Which actor may move a
//! request from one status to another is decided by the transition table in
//! `transition`, never by comparing string literals.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Newtype for a request id to prevent mixing it with profile ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Newtype for a profile id. A regional chapter is identified by the
/// profile id of its filing account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(pub Uuid);

impl ProfileId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProfileId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ProfileId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Error returned when parsing one of the workflow enums from its wire name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Status of an SK request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Meeting report saved, roster not yet submitted.
    Draft,
    /// Roster committed, waiting for verification.
    Submitted,
    Verified,
    VerificationRejected,
    Tier1Approved,
    Tier1Rejected,
    Tier2Approved,
    Tier2Rejected,
    /// Decree issued. Terminal.
    DecreeIssued,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 9] = [
        Self::Draft,
        Self::Submitted,
        Self::Verified,
        Self::VerificationRejected,
        Self::Tier1Approved,
        Self::Tier1Rejected,
        Self::Tier2Approved,
        Self::Tier2Rejected,
        Self::DecreeIssued,
    ];

    /// Stable wire/storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Verified => "verified",
            Self::VerificationRejected => "verification_rejected",
            Self::Tier1Approved => "tier1_approved",
            Self::Tier1Rejected => "tier1_rejected",
            Self::Tier2Approved => "tier2_approved",
            Self::Tier2Rejected => "tier2_rejected",
            Self::DecreeIssued => "decree_issued",
        }
    }

    /// Human-readable label shown on dashboards.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Submitted => "Submitted",
            Self::Verified => "Verified",
            Self::VerificationRejected => "Rejected at verification",
            Self::Tier1Approved => "Approved (tier 1)",
            Self::Tier1Rejected => "Rejected (tier 1)",
            Self::Tier2Approved => "Approved (tier 2)",
            Self::Tier2Rejected => "Rejected (tier 2)",
            Self::DecreeIssued => "Decree issued",
        }
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::DecreeIssued)
    }

    /// Returns true for the `*_rejected` statuses.
    pub fn is_rejected(&self) -> bool {
        matches!(
            self,
            Self::VerificationRejected | Self::Tier1Rejected | Self::Tier2Rejected
        )
    }

    /// Returns true if the filer may still edit the meeting report and roster.
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Draft) || self.is_rejected()
    }

    /// Returns true while a reviewer holds the request.
    pub fn is_under_review(&self) -> bool {
        matches!(
            self,
            Self::Submitted | Self::Verified | Self::Tier1Approved | Self::Tier2Approved
        )
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "request status",
                value: s.to_string(),
            })
    }
}

/// Role attached to a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regional chapter account that files requests.
    RegionalFiler,
    Verifier,
    Tier1Approver,
    Tier2Approver,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Self::RegionalFiler,
        Self::Verifier,
        Self::Tier1Approver,
        Self::Tier2Approver,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RegionalFiler => "regional_filer",
            Self::Verifier => "verifier",
            Self::Tier1Approver => "tier1_approver",
            Self::Tier2Approver => "tier2_approver",
        }
    }

    /// Returns true for the three reviewing roles.
    pub fn is_reviewer(&self) -> bool {
        !matches!(self, Self::RegionalFiler)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "role",
                value: s.to_string(),
            })
    }
}

/// Decision an actor applies to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Filer hands the request over for review.
    Submit,
    Approve,
    /// Requires a revision note.
    Reject,
    /// Final approver issues the decree.
    Issue,
}

impl Decision {
    pub const ALL: [Decision; 4] = [Self::Submit, Self::Approve, Self::Reject, Self::Issue];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Issue => "issue",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Decision {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|decision| decision.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "decision",
                value: s.to_string(),
            })
    }
}

/// The identity performing an operation, as resolved by the session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ProfileId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: ProfileId, role: Role) -> Self {
        Self { id, role }
    }
}

/// Meeting details entered on the first step of a filing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingDetails {
    pub date: NaiveDate,
    pub location: String,
}

/// An SK request, one per filing cycle per chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkRequest {
    pub id: RequestId,
    pub chapter_id: ProfileId,
    pub meeting_date: NaiveDate,
    pub meeting_location: String,
    /// Blob key of the uploaded meeting report.
    pub meeting_report: Option<String>,
    pub status: RequestStatus,
    pub verified_by: Option<ProfileId>,
    pub verified_at: Option<DateTime<Utc>>,
    pub tier1_approved_by: Option<ProfileId>,
    pub tier1_approved_at: Option<DateTime<Utc>>,
    pub tier2_approved_by: Option<ProfileId>,
    pub tier2_approved_at: Option<DateTime<Utc>>,
    pub decree_issued_at: Option<DateTime<Utc>>,
    /// Set by a rejection, cleared by the next submission or approval.
    pub revision_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Incremented on every persisted mutation; used for conflict detection.
    pub version: u64,
}

impl SkRequest {
    /// Creates a new draft request for a chapter.
    pub fn draft(
        chapter_id: ProfileId,
        meeting: MeetingDetails,
        meeting_report: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RequestId::new(),
            chapter_id,
            meeting_date: meeting.date,
            meeting_location: meeting.location,
            meeting_report,
            status: RequestStatus::Draft,
            verified_by: None,
            verified_at: None,
            tier1_approved_by: None,
            tier1_approved_at: None,
            tier2_approved_by: None,
            tier2_approved_at: None,
            decree_issued_at: None,
            revision_note: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Returns true while this request blocks the chapter from opening another.
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }
}
