//! Conversions between SQLite rows and domain types.
//!
//! Everything is stored as TEXT except counters. Timestamps use RFC 3339 with
//! fixed nanosecond precision so lexical order matches time order.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::Row;
use uuid::Uuid;

use super::super::{Profile, RepositoryError, RequestListing};
use sk_portal_core::{
    Bureau, CustomTitle, Decision, Gender, HistoryEntry, Officer, OfficerDetails, ProfileId,
    RequestId, RequestStatus, Role, SkRequest, StructureCategory,
};

pub(super) const REQUEST_COLUMNS: &str = "r.id, r.chapter_id, r.meeting_date, r.meeting_location, \
     r.meeting_report, r.status, r.verified_by, r.verified_at, r.tier1_approved_by, \
     r.tier1_approved_at, r.tier2_approved_by, r.tier2_approved_at, r.decree_issued_at, \
     r.revision_note, r.created_at, r.updated_at, r.version";

pub(super) const OFFICER_COLUMNS: &str =
    "request_id, position, structure, bureau, title, full_name, gender, id_document";

pub(super) const HISTORY_COLUMNS: &str =
    "request_id, actor_id, role, decision, from_status, to_status, note, recorded_at";

pub(super) fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(super) fn opt_timestamp(at: &Option<DateTime<Utc>>) -> Option<String> {
    at.as_ref().map(timestamp)
}

pub(super) fn version_to_i64(version: u64) -> Result<i64, RepositoryError> {
    i64::try_from(version).map_err(|_| {
        RepositoryError::storage(
            "encode version",
            format!("version {} exceeds maximum storable value", version),
        )
    })
}

fn parse_timestamp(value: &str, what: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| RepositoryError::corruption(format!("{} timestamp", what)))
}

fn parse_opt_timestamp(
    value: Option<String>,
    what: &str,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    value.map(|v| parse_timestamp(&v, what)).transpose()
}

fn parse_uuid(value: &str, what: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(value).map_err(|_| RepositoryError::corruption(format!("{} id", what)))
}

fn parse_profile_id(value: Option<String>, what: &str) -> Result<Option<ProfileId>, RepositoryError> {
    value
        .map(|v| parse_uuid(&v, what).map(ProfileId))
        .transpose()
}

fn parse_enum<T: FromStr>(value: &str, what: &str) -> Result<T, RepositoryError> {
    value
        .parse()
        .map_err(|_| RepositoryError::corruption(format!("{} value {:?}", what, value)))
}

fn non_negative(value: i64, what: &str) -> Result<u64, RepositoryError> {
    u64::try_from(value).map_err(|_| RepositoryError::corruption(format!("negative {}", what)))
}

/// A request row as read from SQLite, before validation.
pub(super) struct RawRequest {
    id: String,
    chapter_id: String,
    meeting_date: String,
    meeting_location: String,
    meeting_report: Option<String>,
    status: String,
    verified_by: Option<String>,
    verified_at: Option<String>,
    tier1_approved_by: Option<String>,
    tier1_approved_at: Option<String>,
    tier2_approved_by: Option<String>,
    tier2_approved_at: Option<String>,
    decree_issued_at: Option<String>,
    revision_note: Option<String>,
    created_at: String,
    updated_at: String,
    version: i64,
}

impl RawRequest {
    /// Reads the columns listed in [`REQUEST_COLUMNS`], starting at index 0.
    pub(super) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            chapter_id: row.get(1)?,
            meeting_date: row.get(2)?,
            meeting_location: row.get(3)?,
            meeting_report: row.get(4)?,
            status: row.get(5)?,
            verified_by: row.get(6)?,
            verified_at: row.get(7)?,
            tier1_approved_by: row.get(8)?,
            tier1_approved_at: row.get(9)?,
            tier2_approved_by: row.get(10)?,
            tier2_approved_at: row.get(11)?,
            decree_issued_at: row.get(12)?,
            revision_note: row.get(13)?,
            created_at: row.get(14)?,
            updated_at: row.get(15)?,
            version: row.get(16)?,
        })
    }

    pub(super) fn into_request(self) -> Result<SkRequest, RepositoryError> {
        Ok(SkRequest {
            id: RequestId(parse_uuid(&self.id, "request")?),
            chapter_id: ProfileId(parse_uuid(&self.chapter_id, "chapter")?),
            meeting_date: NaiveDate::parse_from_str(&self.meeting_date, "%Y-%m-%d")
                .map_err(|_| RepositoryError::corruption("meeting date"))?,
            meeting_location: self.meeting_location,
            meeting_report: self.meeting_report,
            status: parse_enum::<RequestStatus>(&self.status, "status")?,
            verified_by: parse_profile_id(self.verified_by, "verifier")?,
            verified_at: parse_opt_timestamp(self.verified_at, "verified_at")?,
            tier1_approved_by: parse_profile_id(self.tier1_approved_by, "tier1 approver")?,
            tier1_approved_at: parse_opt_timestamp(self.tier1_approved_at, "tier1_approved_at")?,
            tier2_approved_by: parse_profile_id(self.tier2_approved_by, "tier2 approver")?,
            tier2_approved_at: parse_opt_timestamp(self.tier2_approved_at, "tier2_approved_at")?,
            decree_issued_at: parse_opt_timestamp(self.decree_issued_at, "decree_issued_at")?,
            revision_note: self.revision_note,
            created_at: parse_timestamp(&self.created_at, "created_at")?,
            updated_at: parse_timestamp(&self.updated_at, "updated_at")?,
            version: non_negative(self.version, "version")?,
        })
    }
}

/// A request row joined with its chapter profile.
pub(super) struct RawListing {
    request: RawRequest,
    chapter_name: Option<String>,
    region: Option<String>,
}

impl RawListing {
    /// Expects [`REQUEST_COLUMNS`] followed by `p.full_name, p.region`.
    pub(super) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            request: RawRequest::from_row(row)?,
            chapter_name: row.get(17)?,
            region: row.get(18)?,
        })
    }

    pub(super) fn into_listing(self) -> Result<RequestListing, RepositoryError> {
        Ok(RequestListing {
            request: self.request.into_request()?,
            chapter_name: self.chapter_name.unwrap_or_default(),
            region: self.region,
        })
    }
}

pub(super) type RawProfile = (String, String, String, Option<String>);

pub(super) fn profile_from_raw(raw: RawProfile) -> Result<Profile, RepositoryError> {
    let (id, full_name, role, region) = raw;
    Ok(Profile {
        id: ProfileId(parse_uuid(&id, "profile")?),
        full_name,
        role: parse_enum::<Role>(&role, "role")?,
        region,
    })
}

pub(super) struct RawOfficer {
    request_id: String,
    position: i64,
    structure: String,
    bureau: Option<String>,
    title: String,
    full_name: String,
    gender: String,
    id_document: String,
}

impl RawOfficer {
    pub(super) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            request_id: row.get(0)?,
            position: row.get(1)?,
            structure: row.get(2)?,
            bureau: row.get(3)?,
            title: row.get(4)?,
            full_name: row.get(5)?,
            gender: row.get(6)?,
            id_document: row.get(7)?,
        })
    }

    pub(super) fn into_officer(self) -> Result<Officer, RepositoryError> {
        Ok(Officer {
            request_id: RequestId(parse_uuid(&self.request_id, "request")?),
            details: OfficerDetails {
                structure: parse_enum::<StructureCategory>(&self.structure, "structure")?,
                bureau: self
                    .bureau
                    .map(|b| parse_enum::<Bureau>(&b, "bureau"))
                    .transpose()?,
                title: self.title,
                full_name: self.full_name,
                gender: parse_enum::<Gender>(&self.gender, "gender")?,
            },
            id_document: self.id_document,
            position: u32::try_from(self.position)
                .map_err(|_| RepositoryError::corruption("officer position"))?,
        })
    }
}

pub(super) struct RawHistory {
    request_id: String,
    actor_id: String,
    role: String,
    decision: String,
    from_status: String,
    to_status: String,
    note: Option<String>,
    recorded_at: String,
}

impl RawHistory {
    pub(super) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            request_id: row.get(0)?,
            actor_id: row.get(1)?,
            role: row.get(2)?,
            decision: row.get(3)?,
            from_status: row.get(4)?,
            to_status: row.get(5)?,
            note: row.get(6)?,
            recorded_at: row.get(7)?,
        })
    }

    pub(super) fn into_entry(self) -> Result<HistoryEntry, RepositoryError> {
        Ok(HistoryEntry {
            request_id: RequestId(parse_uuid(&self.request_id, "request")?),
            actor_id: ProfileId(parse_uuid(&self.actor_id, "actor")?),
            role: parse_enum::<Role>(&self.role, "role")?,
            decision: parse_enum::<Decision>(&self.decision, "decision")?,
            from_status: parse_enum::<RequestStatus>(&self.from_status, "status")?,
            to_status: parse_enum::<RequestStatus>(&self.to_status, "status")?,
            note: self.note,
            recorded_at: parse_timestamp(&self.recorded_at, "recorded_at")?,
        })
    }
}

pub(super) fn custom_title_from_raw(
    structure: String,
    title: String,
) -> Result<CustomTitle, RepositoryError> {
    Ok(CustomTitle {
        structure: parse_enum::<StructureCategory>(&structure, "structure")?,
        title,
    })
}
