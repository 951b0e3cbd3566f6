//! Portal service: the operations behind the HTTP API.
//!
//! Every operation resolves the caller's role first, validates input, and
//! only then touches storage. State changes go through the pure `transition`
//! function and are committed with a version check, so two reviewers acting
//! on the same request cannot both succeed.

mod detail;
mod effects;


pub use detail::RequestDetail;
pub use effects::execute_effects;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::blob::{
    meeting_report_key, officer_document_key, BlobStore, Bucket, SignedUrl, StoredBlob, UrlSigner,
};
use crate::dashboard::{DashboardData, RequestFilter};
use crate::error::PortalError;
use crate::repository::{PortalRepository, Profile, RequestUpdate};
use sk_portal_core::{
    available_titles, is_title_allowed, transition, Actor, Decision, DocumentKind, DocumentSource,
    DocumentUpload, MeetingDetails, ProfileId, RequestId, Role, RosterDraft, SkRequest,
    StructureCategory, CustomTitle, ValidationError,
};

/// Which stored document a signed URL is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentRef {
    MeetingReport,
    OfficerDocument { position: u32 },
}

pub struct PortalService {
    repo: Arc<dyn PortalRepository>,
    blobs: Arc<dyn BlobStore>,
    signer: UrlSigner,
}

impl PortalService {
    pub fn new(repo: Arc<dyn PortalRepository>, blobs: Arc<dyn BlobStore>, signer: UrlSigner) -> Self {
        Self {
            repo,
            blobs,
            signer,
        }
    }

    pub fn repository(&self) -> &Arc<dyn PortalRepository> {
        &self.repo
    }

    // =========================================================================
    // Identity and access
    // =========================================================================

    /// Resolves the profile forwarded by the gateway. Unknown ids are refused.
    pub async fn resolve_profile(&self, id: ProfileId) -> Result<Profile, PortalError> {
        self.repo
            .get_profile(id)
            .await?
            .ok_or_else(|| PortalError::forbidden(format!("unknown profile {}", id)))
    }

    fn require_filer(profile: &Profile) -> Result<Actor, PortalError> {
        if profile.role == Role::RegionalFiler {
            Ok(Actor::new(profile.id, profile.role))
        } else {
            Err(PortalError::forbidden(format!(
                "only regional filers can do this; you are {}",
                profile.role
            )))
        }
    }

    fn require_reviewer(profile: &Profile) -> Result<Actor, PortalError> {
        if profile.role.is_reviewer() {
            Ok(Actor::new(profile.id, profile.role))
        } else {
            Err(PortalError::forbidden("only reviewers can do this"))
        }
    }

    /// Filers see only their own chapter's requests; reviewers see all.
    fn ensure_can_read(profile: &Profile, request: &SkRequest) -> Result<(), PortalError> {
        if profile.role.is_reviewer() || request.chapter_id == profile.id {
            Ok(())
        } else {
            Err(PortalError::forbidden(
                "this request belongs to another chapter",
            ))
        }
    }

    fn ensure_editable(request: &SkRequest) -> Result<(), PortalError> {
        if request.status.is_editable() {
            Ok(())
        } else {
            Err(PortalError::conflict(format!(
                "request is {} and can no longer be edited",
                request.status
            )))
        }
    }

    fn ensure_version(request: &SkRequest, expected_version: u64) -> Result<(), PortalError> {
        if request.version == expected_version {
            Ok(())
        } else {
            Err(PortalError::conflict(format!(
                "request was modified (now at version {}, expected {})",
                request.version, expected_version
            )))
        }
    }

    async fn load_request(&self, id: RequestId) -> Result<SkRequest, PortalError> {
        self.repo
            .get_request(id)
            .await?
            .ok_or_else(|| PortalError::not_found(format!("request {}", id)))
    }

    /// Loads a request `profile` may submit, refusing other roles, other
    /// chapters and locked statuses before any roster is looked at.
    async fn submission_target(
        &self,
        profile: &Profile,
        request_id: RequestId,
    ) -> Result<(Actor, SkRequest), PortalError> {
        let actor = Self::require_filer(profile)?;
        let request = self.load_request(request_id).await?;
        Self::ensure_can_read(profile, &request)?;
        transition(&request, &actor, Decision::Submit, None, Utc::now())?;
        Ok((actor, request))
    }

    /// Best-effort removal of blobs that are no longer referenced.
    async fn discard_blobs(&self, bucket: Bucket, keys: &[String]) {
        for key in keys {
            if let Err(e) = self.blobs.delete(bucket, key).await {
                warn!("Failed to delete orphaned blob {}/{}: {}", bucket, key, e);
            }
        }
    }

    // =========================================================================
    // Meeting report
    // =========================================================================

    /// Saves the meeting details and optionally a new report.
    ///
    /// Updates the chapter's editable request or opens a new draft. A request
    /// under review cannot be changed. The request must end up with a report.
    pub async fn save_meeting_report(
        &self,
        profile: &Profile,
        meeting: MeetingDetails,
        upload: Option<DocumentUpload>,
    ) -> Result<SkRequest, PortalError> {
        Self::require_filer(profile)?;
        let location = meeting.location.trim().to_string();
        if location.is_empty() {
            return Err(ValidationError::MissingField {
                field: "meeting location",
            }
            .into());
        }
        if let Some(upload) = &upload {
            upload.validate(DocumentKind::MeetingReport)?;
        }

        let active = self.repo.active_request(profile.id).await?;
        if let Some(active) = &active {
            Self::ensure_editable(active)?;
        }
        let existing_report = active.as_ref().and_then(|r| r.meeting_report.clone());
        if upload.is_none() && existing_report.is_none() {
            return Err(ValidationError::MissingField {
                field: "meeting report",
            }
            .into());
        }

        let fresh_key = match upload {
            Some(upload) => {
                let key = meeting_report_key(profile.id, &upload);
                self.blobs
                    .put(Bucket::MeetingReports, &key, StoredBlob::from(upload))
                    .await?;
                Some(key)
            }
            None => None,
        };

        let now = Utc::now();
        let meeting = MeetingDetails {
            date: meeting.date,
            location,
        };
        let result = match active {
            Some(current) => {
                let mut next = current.clone();
                next.meeting_date = meeting.date;
                next.meeting_location = meeting.location;
                if let Some(key) = &fresh_key {
                    next.meeting_report = Some(key.clone());
                }
                next.updated_at = now;
                self.repo
                    .apply_update(RequestUpdate::new(next, current.version))
                    .await
            }
            None => {
                self.repo
                    .create_request(SkRequest::draft(profile.id, meeting, fresh_key.clone(), now))
                    .await
            }
        };

        match result {
            Ok(saved) => {
                if let (Some(_), Some(old)) = (&fresh_key, existing_report) {
                    self.discard_blobs(Bucket::MeetingReports, &[old]).await;
                }
                info!(
                    "Saved meeting report for request {} (chapter {})",
                    saved.id, profile.id
                );
                Ok(saved)
            }
            Err(e) => {
                if let Some(key) = fresh_key {
                    self.discard_blobs(Bucket::MeetingReports, &[key]).await;
                }
                Err(e.into())
            }
        }
    }

    /// Deletes the report of an editable request and clears the reference.
    pub async fn remove_meeting_report(
        &self,
        profile: &Profile,
        request_id: RequestId,
    ) -> Result<SkRequest, PortalError> {
        Self::require_filer(profile)?;
        let request = self.load_request(request_id).await?;
        Self::ensure_can_read(profile, &request)?;
        Self::ensure_editable(&request)?;
        let Some(key) = request.meeting_report.clone() else {
            return Err(PortalError::not_found("meeting report"));
        };

        let mut next = request.clone();
        next.meeting_report = None;
        next.updated_at = Utc::now();
        let saved = self
            .repo
            .apply_update(RequestUpdate::new(next, request.version))
            .await?;
        self.discard_blobs(Bucket::MeetingReports, &[key]).await;
        info!("Removed meeting report from request {}", saved.id);
        Ok(saved)
    }

    // =========================================================================
    // Titles
    // =========================================================================

    /// Standard titles for `structure` followed by the chapter's custom ones.
    pub async fn list_titles(
        &self,
        profile: &Profile,
        structure: StructureCategory,
    ) -> Result<Vec<String>, PortalError> {
        let custom = self.repo.custom_titles(profile.id).await?;
        Ok(available_titles(structure, &custom))
    }

    /// Custom titles a roster for `request_id` may use. Fails the same way
    /// `submit_roster` would when `profile` may not submit that request.
    pub async fn roster_titles(
        &self,
        profile: &Profile,
        request_id: RequestId,
    ) -> Result<Vec<CustomTitle>, PortalError> {
        let (_, request) = self.submission_target(profile, request_id).await?;
        Ok(self.repo.custom_titles(request.chapter_id).await?)
    }

    pub async fn register_custom_title(
        &self,
        profile: &Profile,
        structure: StructureCategory,
        title: &str,
    ) -> Result<CustomTitle, PortalError> {
        Self::require_filer(profile)?;
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::MissingField { field: "title" }.into());
        }
        let custom = self.repo.custom_titles(profile.id).await?;
        if is_title_allowed(structure, title, &custom) {
            return Err(ValidationError::DuplicateTitle {
                structure,
                title: title.to_string(),
            }
            .into());
        }
        let entry = CustomTitle {
            structure,
            title: title.to_string(),
        };
        self.repo
            .add_custom_title(profile.id, entry.clone())
            .await?;
        info!(
            "Registered custom title {:?} under {} for chapter {}",
            entry.title,
            structure.as_str(),
            profile.id
        );
        Ok(entry)
    }

    // =========================================================================
    // Roster submission
    // =========================================================================

    /// Loads the persisted roster of a request into a draft for editing.
    pub async fn roster_draft(
        &self,
        profile: &Profile,
        request_id: RequestId,
    ) -> Result<RosterDraft, PortalError> {
        let request = self.load_request(request_id).await?;
        Self::ensure_can_read(profile, &request)?;
        Ok(RosterDraft::from_persisted(
            self.repo.officers(request_id).await?,
        ))
    }

    /// Commits a roster and submits the request for verification.
    ///
    /// All checks run before anything is written. Pending identity documents
    /// are uploaded next; the roster replacement, the status change and the
    /// history entry are then committed together. If the commit fails the
    /// freshly uploaded documents are deleted again.
    pub async fn submit_roster(
        &self,
        profile: &Profile,
        request_id: RequestId,
        expected_version: u64,
        draft: RosterDraft,
    ) -> Result<SkRequest, PortalError> {
        let (actor, request) = self.submission_target(profile, request_id).await?;
        Self::ensure_version(&request, expected_version)?;

        let result = transition(&request, &actor, Decision::Submit, None, Utc::now())?;

        let custom = self.repo.custom_titles(request.chapter_id).await?;
        draft.validate_for_submission(&custom)?;
        if request.meeting_report.is_none() {
            return Err(ValidationError::MissingField {
                field: "meeting report",
            }
            .into());
        }

        let previous = self.repo.officers(request_id).await?;
        let previous_keys: HashSet<String> =
            previous.iter().map(|o| o.id_document.clone()).collect();
        for staged in draft.officers() {
            if let DocumentSource::Stored(key) = &staged.document {
                if !previous_keys.contains(key) {
                    return Err(ValidationError::ForeignDocument { key: key.clone() }
                        .for_officer(staged.position)
                        .into());
                }
            }
        }

        let mut fresh_keys = Vec::new();
        let mut officers = Vec::with_capacity(draft.len());
        for staged in draft.into_officers() {
            let key = match &staged.document {
                DocumentSource::Stored(key) => key.clone(),
                DocumentSource::Pending(upload) => {
                    let key = officer_document_key(request_id, upload);
                    let blob = StoredBlob::from(upload.clone());
                    if let Err(e) = self.blobs.put(Bucket::OfficerDocuments, &key, blob).await {
                        self.discard_blobs(Bucket::OfficerDocuments, &fresh_keys)
                            .await;
                        return Err(e.into());
                    }
                    fresh_keys.push(key.clone());
                    key
                }
            };
            officers.push(staged.into_officer(request_id, key));
        }

        let kept_keys: HashSet<String> = officers.iter().map(|o| o.id_document.clone()).collect();
        let update = RequestUpdate::new(result.request.clone(), expected_version)
            .with_roster(officers)
            .with_history(result.history());

        match self.repo.apply_update(update).await {
            Ok(saved) => {
                execute_effects(&result.effects);
                let dropped: Vec<String> = previous_keys
                    .into_iter()
                    .filter(|k| !kept_keys.contains(k))
                    .collect();
                self.discard_blobs(Bucket::OfficerDocuments, &dropped).await;
                Ok(saved)
            }
            Err(e) => {
                self.discard_blobs(Bucket::OfficerDocuments, &fresh_keys)
                    .await;
                Err(e.into())
            }
        }
    }

    // =========================================================================
    // Review
    // =========================================================================

    /// Applies a reviewer decision.
    pub async fn decide(
        &self,
        profile: &Profile,
        request_id: RequestId,
        expected_version: u64,
        decision: Decision,
        note: Option<&str>,
    ) -> Result<SkRequest, PortalError> {
        let actor = Self::require_reviewer(profile)?;
        if decision == Decision::Submit {
            return Err(PortalError::forbidden(
                "requests are submitted by committing their roster",
            ));
        }
        let request = self.load_request(request_id).await?;
        Self::ensure_version(&request, expected_version)?;

        let result = transition(&request, &actor, decision, note, Utc::now())?;
        let update = RequestUpdate::new(result.request.clone(), expected_version)
            .with_history(result.history());
        let saved = self.repo.apply_update(update).await?;
        execute_effects(&result.effects);
        Ok(saved)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    async fn detail_of(&self, profile: &Profile, request: SkRequest) -> Result<RequestDetail, PortalError> {
        let chapter = self.repo.get_profile(request.chapter_id).await?;
        let officers = self.repo.officers(request.id).await?;
        let history = self.repo.history(request.id).await?;
        Ok(RequestDetail::build(
            profile.role,
            request,
            chapter,
            officers,
            history,
        ))
    }

    pub async fn request_detail(
        &self,
        profile: &Profile,
        request_id: RequestId,
    ) -> Result<RequestDetail, PortalError> {
        let request = self.load_request(request_id).await?;
        Self::ensure_can_read(profile, &request)?;
        self.detail_of(profile, request).await
    }

    /// The filer's active request, or the latest one if none is active.
    pub async fn my_request(&self, profile: &Profile) -> Result<Option<RequestDetail>, PortalError> {
        Self::require_filer(profile)?;
        let request = match self.repo.active_request(profile.id).await? {
            Some(request) => Some(request),
            None => self.repo.latest_request(profile.id).await?,
        };
        match request {
            Some(request) => Ok(Some(self.detail_of(profile, request).await?)),
            None => Ok(None),
        }
    }

    pub async fn dashboard(
        &self,
        profile: &Profile,
        filter: &RequestFilter,
    ) -> Result<DashboardData, PortalError> {
        Self::require_reviewer(profile)?;
        let listings = self.repo.list_requests().await?;
        Ok(DashboardData::from_listings(listings, filter))
    }

    // =========================================================================
    // Documents
    // =========================================================================

    /// Signed, time-limited read URL for a document of a request.
    pub async fn document_url(
        &self,
        profile: &Profile,
        request_id: RequestId,
        document: DocumentRef,
    ) -> Result<SignedUrl, PortalError> {
        let request = self.load_request(request_id).await?;
        Self::ensure_can_read(profile, &request)?;
        let (bucket, key) = match document {
            DocumentRef::MeetingReport => (
                Bucket::MeetingReports,
                request
                    .meeting_report
                    .ok_or_else(|| PortalError::not_found("meeting report"))?,
            ),
            DocumentRef::OfficerDocument { position } => {
                let officers = self.repo.officers(request_id).await?;
                let officer = officers
                    .into_iter()
                    .find(|o| o.position == position)
                    .ok_or_else(|| PortalError::not_found(format!("officer {}", position)))?;
                (Bucket::OfficerDocuments, officer.id_document)
            }
        };
        Ok(self.signer.sign(bucket, &key, Utc::now()))
    }

    /// Serves a blob after checking the URL signature.
    pub async fn read_blob(
        &self,
        bucket: Bucket,
        key: &str,
        expires: i64,
        signature: &str,
    ) -> Result<StoredBlob, PortalError> {
        self.signer
            .verify(bucket, key, expires, signature, Utc::now())?;
        self.blobs
            .get(bucket, key)
            .await?
            .ok_or_else(|| PortalError::not_found(format!("document {}/{}", bucket, key)))
    }
}
