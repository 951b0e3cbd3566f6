//! Repository abstraction for portal persistence.
//!
//! This module defines the `PortalRepository` trait that abstracts storage of
//! profiles, requests, rosters, custom titles and request history.
//! Implementations provide different backends (in-memory, SQLite).

mod memory;
pub mod sqlite;

pub use memory::InMemoryRepository;
pub use sqlite::SqliteRepository;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use sk_portal_core::{
    CustomTitle, ErrorKind, HistoryEntry, Officer, ProfileId, RequestId, Role, SkRequest,
};

/// Errors from a repository backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("storage error during {operation}: {message}")]
    Storage {
        operation: &'static str,
        message: String,
    },

    #[error("corrupt {what} in storage")]
    Corruption { what: String },

    #[error("request {id} not found")]
    RequestNotFound { id: RequestId },

    #[error("request {id} was modified concurrently (expected version {expected})")]
    VersionConflict { id: RequestId, expected: u64 },

    #[error("request {id} already exists")]
    RequestExists { id: RequestId },

    #[error("chapter {chapter} already has an active request")]
    ActiveRequestExists { chapter: ProfileId },

    #[error("title \"{title}\" is already registered")]
    DuplicateTitle { title: String },
}

impl RepositoryError {
    pub fn storage(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Storage {
            operation,
            message: message.into(),
        }
    }

    pub fn corruption(what: impl Into<String>) -> Self {
        Self::Corruption { what: what.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Storage { .. } | Self::Corruption { .. } => ErrorKind::Upstream,
            Self::RequestNotFound { .. } => ErrorKind::NotFound,
            Self::VersionConflict { .. }
            | Self::RequestExists { .. }
            | Self::ActiveRequestExists { .. } => ErrorKind::Conflict,
            Self::DuplicateTitle { .. } => ErrorKind::Validation,
        }
    }
}

/// A portal user as resolved from the identity forwarded by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub full_name: String,
    pub role: Role,
    /// Province of a regional chapter; `None` for reviewers.
    pub region: Option<String>,
}

/// A request together with the chapter fields the dashboard shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestListing {
    #[serde(flatten)]
    pub request: SkRequest,
    pub chapter_name: String,
    pub region: Option<String>,
}

/// A versioned write of one request.
///
/// The request row, the optional roster replacement and the history entries
/// are committed together or not at all.
#[derive(Debug, Clone)]
pub struct RequestUpdate {
    pub request: SkRequest,
    /// Version the caller read; the write fails if storage has moved on.
    pub expected_version: u64,
    /// Replaces the whole roster when set.
    pub roster: Option<Vec<Officer>>,
    pub history: Vec<HistoryEntry>,
}

impl RequestUpdate {
    pub fn new(request: SkRequest, expected_version: u64) -> Self {
        Self {
            request,
            expected_version,
            roster: None,
            history: Vec::new(),
        }
    }

    pub fn with_roster(mut self, roster: Vec<Officer>) -> Self {
        self.roster = Some(roster);
        self
    }

    pub fn with_history(mut self, history: Vec<HistoryEntry>) -> Self {
        self.history = history;
        self
    }
}

/// Repository trait for persisting portal state.
#[async_trait]
pub trait PortalRepository: Send + Sync {
    async fn get_profile(&self, id: ProfileId) -> Result<Option<Profile>, RepositoryError>;

    /// Store a profile (upsert semantics).
    async fn put_profile(&self, profile: Profile) -> Result<(), RepositoryError>;

    async fn get_request(&self, id: RequestId) -> Result<Option<SkRequest>, RepositoryError>;

    /// The chapter's non-terminal request, if any.
    async fn active_request(&self, chapter: ProfileId)
        -> Result<Option<SkRequest>, RepositoryError>;

    /// The chapter's most recently created request.
    async fn latest_request(&self, chapter: ProfileId)
        -> Result<Option<SkRequest>, RepositoryError>;

    /// Insert a new request at version 1.
    ///
    /// Fails with `ActiveRequestExists` if the chapter already has an active request.
    async fn create_request(&self, request: SkRequest) -> Result<SkRequest, RepositoryError>;

    /// Apply a versioned update atomically and return the stored request with
    /// its version incremented.
    async fn apply_update(&self, update: RequestUpdate) -> Result<SkRequest, RepositoryError>;

    /// All requests with chapter details, most recently updated first.
    async fn list_requests(&self) -> Result<Vec<RequestListing>, RepositoryError>;

    /// The roster of a request ordered by position.
    async fn officers(&self, request: RequestId) -> Result<Vec<Officer>, RepositoryError>;

    /// History of a request, oldest first.
    async fn history(&self, request: RequestId) -> Result<Vec<HistoryEntry>, RepositoryError>;

    async fn custom_titles(&self, chapter: ProfileId) -> Result<Vec<CustomTitle>, RepositoryError>;

    /// Register a custom title. Fails with `DuplicateTitle` if the chapter
    /// already has it (case-insensitive) under the same category.
    async fn add_custom_title(
        &self,
        chapter: ProfileId,
        title: CustomTitle,
    ) -> Result<(), RepositoryError>;
}

/// Shared behaviour checks run against every backend.
#[cfg(test)]
pub(crate) mod contract {
    use chrono::{NaiveDate, TimeZone, Utc};
    use sk_portal_core::{
        transition, Actor, Decision, Gender, MeetingDetails, OfficerDetails, RequestStatus,
        StructureCategory,
    };

    use super::*;

    pub fn filer(name: &str) -> Profile {
        Profile {
            id: ProfileId::new(),
            full_name: name.to_string(),
            role: Role::RegionalFiler,
            region: Some("Jawa Barat".to_string()),
        }
    }

    pub fn draft_for(chapter: ProfileId) -> SkRequest {
        SkRequest::draft(
            chapter,
            MeetingDetails {
                date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                location: "Bandung".to_string(),
            },
            Some(format!("{}/report.pdf", chapter)),
            Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap(),
        )
    }

    pub fn officer(request: RequestId, name: &str, position: u32) -> Officer {
        Officer {
            request_id: request,
            details: OfficerDetails {
                structure: StructureCategory::AdvisoryBoard,
                bureau: None,
                title: "Ketua".to_string(),
                full_name: name.to_string(),
                gender: Gender::Female,
            },
            id_document: format!("{}/{}.pdf", request, name),
            position,
        }
    }

    pub async fn create_then_get(repo: &dyn PortalRepository) {
        let chapter = filer("DPD Bandung");
        repo.put_profile(chapter.clone()).await.unwrap();
        let created = repo.create_request(draft_for(chapter.id)).await.unwrap();
        assert_eq!(created.version, 1);

        let fetched = repo.get_request(created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(
            repo.active_request(chapter.id).await.unwrap().map(|r| r.id),
            Some(created.id)
        );
        assert_eq!(
            repo.get_profile(chapter.id).await.unwrap(),
            Some(chapter.clone())
        );
    }

    pub async fn one_active_request_per_chapter(repo: &dyn PortalRepository) {
        let chapter = filer("DPD Bogor");
        repo.put_profile(chapter.clone()).await.unwrap();
        repo.create_request(draft_for(chapter.id)).await.unwrap();
        let err = repo.create_request(draft_for(chapter.id)).await.unwrap_err();
        assert_eq!(
            err,
            RepositoryError::ActiveRequestExists {
                chapter: chapter.id
            }
        );
    }

    pub async fn stale_version_conflicts(repo: &dyn PortalRepository) {
        let chapter = filer("DPD Depok");
        repo.put_profile(chapter.clone()).await.unwrap();
        let created = repo.create_request(draft_for(chapter.id)).await.unwrap();

        let mut edit = created.clone();
        edit.meeting_location = "Depok".to_string();
        let updated = repo
            .apply_update(RequestUpdate::new(edit.clone(), created.version))
            .await
            .unwrap();
        assert_eq!(updated.version, 2);

        let err = repo
            .apply_update(RequestUpdate::new(edit, created.version))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RepositoryError::VersionConflict {
                id: created.id,
                expected: created.version
            }
        );

        let missing = draft_for(chapter.id);
        let err = repo
            .apply_update(RequestUpdate::new(missing.clone(), 1))
            .await
            .unwrap_err();
        assert_eq!(err, RepositoryError::RequestNotFound { id: missing.id });
    }

    pub async fn roster_and_history_commit_together(repo: &dyn PortalRepository) {
        let chapter = filer("DPD Bekasi");
        repo.put_profile(chapter.clone()).await.unwrap();
        let created = repo.create_request(draft_for(chapter.id)).await.unwrap();

        let actor = Actor::new(chapter.id, Role::RegionalFiler);
        let result = transition(
            &created,
            &actor,
            Decision::Submit,
            None,
            Utc.with_ymd_and_hms(2024, 5, 3, 9, 0, 0).unwrap(),
        )
        .unwrap();
        let roster = vec![
            officer(created.id, "Siti", 0),
            officer(created.id, "Ani", 1),
        ];
        let update = RequestUpdate::new(result.request.clone(), created.version)
            .with_roster(roster.clone())
            .with_history(result.history());
        let stored = repo.apply_update(update).await.unwrap();
        assert_eq!(stored.status, RequestStatus::Submitted);

        assert_eq!(repo.officers(created.id).await.unwrap(), roster);
        let history = repo.history(created.id).await.unwrap();
        assert_eq!(history, result.history());

        // A conflicting write leaves roster and history untouched.
        let replacement = vec![officer(created.id, "Other", 0)];
        let update = RequestUpdate::new(result.request.clone(), created.version)
            .with_roster(replacement)
            .with_history(result.history());
        assert!(repo.apply_update(update).await.is_err());
        assert_eq!(repo.officers(created.id).await.unwrap(), roster);
        assert_eq!(repo.history(created.id).await.unwrap().len(), 1);
    }

    pub async fn terminal_request_frees_chapter(repo: &dyn PortalRepository) {
        let chapter = filer("DPD Cirebon");
        repo.put_profile(chapter.clone()).await.unwrap();
        let created = repo.create_request(draft_for(chapter.id)).await.unwrap();
        issue(repo, &created).await;
        assert!(repo.active_request(chapter.id).await.unwrap().is_none());

        let mut later = draft_for(chapter.id);
        later.created_at = created.created_at + chrono::Duration::days(30);
        later.updated_at = later.created_at;
        let next = repo.create_request(later).await.unwrap();
        assert_eq!(
            repo.latest_request(chapter.id).await.unwrap().map(|r| r.id),
            Some(next.id)
        );
        assert_eq!(
            repo.active_request(chapter.id).await.unwrap().map(|r| r.id),
            Some(next.id)
        );
    }

    pub async fn latest_request_breaks_ties_by_insertion(repo: &dyn PortalRepository) {
        let chapter = filer("DPD Kuningan");
        repo.put_profile(chapter.clone()).await.unwrap();
        for _ in 0..3 {
            let created = repo.create_request(draft_for(chapter.id)).await.unwrap();
            issue(repo, &created).await;
        }
        // Same `created_at` as the three issued requests.
        let current = repo.create_request(draft_for(chapter.id)).await.unwrap();
        assert_eq!(
            repo.latest_request(chapter.id).await.unwrap().map(|r| r.id),
            Some(current.id)
        );
    }

    pub async fn duplicate_id_is_not_an_active_conflict(repo: &dyn PortalRepository) {
        let chapter = filer("DPD Majalengka");
        repo.put_profile(chapter.clone()).await.unwrap();
        let created = repo.create_request(draft_for(chapter.id)).await.unwrap();
        let issued = issue(repo, &created).await;

        let err = repo.create_request(issued).await.unwrap_err();
        assert_eq!(err, RepositoryError::RequestExists { id: created.id });
        assert!(repo.active_request(chapter.id).await.unwrap().is_none());
    }

    async fn issue(repo: &dyn PortalRepository, request: &SkRequest) -> SkRequest {
        let mut issued = request.clone();
        issued.status = RequestStatus::DecreeIssued;
        repo.apply_update(RequestUpdate::new(issued, request.version))
            .await
            .unwrap()
    }

    pub async fn custom_titles_reject_duplicates(repo: &dyn PortalRepository) {
        let chapter = filer("DPD Garut");
        repo.put_profile(chapter.clone()).await.unwrap();
        let title = CustomTitle {
            structure: StructureCategory::ExpertBoard,
            title: "Anggota 3".to_string(),
        };
        repo.add_custom_title(chapter.id, title.clone()).await.unwrap();
        let err = repo
            .add_custom_title(
                chapter.id,
                CustomTitle {
                    title: "ANGGOTA 3".to_string(),
                    ..title.clone()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateTitle { .. }));

        // Same title under another category is fine.
        repo.add_custom_title(
            chapter.id,
            CustomTitle {
                structure: StructureCategory::AdvisoryBoard,
                ..title.clone()
            },
        )
        .await
        .unwrap();
        assert_eq!(repo.custom_titles(chapter.id).await.unwrap().len(), 2);
        assert!(repo
            .custom_titles(ProfileId::new())
            .await
            .unwrap()
            .is_empty());
    }

    pub async fn listing_joins_chapter(repo: &dyn PortalRepository) {
        let chapter = filer("DPD Tasikmalaya");
        repo.put_profile(chapter.clone()).await.unwrap();
        let created = repo.create_request(draft_for(chapter.id)).await.unwrap();

        let listings = repo.list_requests().await.unwrap();
        let listing = listings
            .iter()
            .find(|l| l.request.id == created.id)
            .unwrap();
        assert_eq!(listing.chapter_name, "DPD Tasikmalaya");
        assert_eq!(listing.region.as_deref(), Some("Jawa Barat"));
    }

    pub async fn run_all(repo: &dyn PortalRepository) {
        create_then_get(repo).await;
        one_active_request_per_chapter(repo).await;
        stale_version_conflicts(repo).await;
        roster_and_history_commit_together(repo).await;
        terminal_request_frees_chapter(repo).await;
        latest_request_breaks_ties_by_insertion(repo).await;
        duplicate_id_is_not_an_active_conflict(repo).await;
        custom_titles_reject_duplicates(repo).await;
        listing_joins_chapter(repo).await;
    }
}
