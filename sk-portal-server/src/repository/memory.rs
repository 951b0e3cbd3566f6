//! In-memory implementation of `PortalRepository`.
//!
//! All state is held in memory and lost on restart. A single lock guards
//! every table so a versioned update is atomic with its roster and history.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{PortalRepository, Profile, RepositoryError, RequestListing, RequestUpdate};
use sk_portal_core::{CustomTitle, HistoryEntry, Officer, ProfileId, RequestId, SkRequest};

#[derive(Default)]
struct Tables {
    profiles: HashMap<ProfileId, Profile>,
    requests: HashMap<RequestId, SkRequest>,
    officers: HashMap<RequestId, Vec<Officer>>,
    history: HashMap<RequestId, Vec<HistoryEntry>>,
    custom_titles: HashMap<ProfileId, Vec<CustomTitle>>,
    /// Insertion sequence per request; breaks `created_at` ties.
    created_seq: HashMap<RequestId, u64>,
    next_seq: u64,
}

impl Tables {
    fn chapter_requests(&self, chapter: ProfileId) -> impl Iterator<Item = &SkRequest> {
        self.requests
            .values()
            .filter(move |r| r.chapter_id == chapter)
    }
}

/// In-memory portal repository.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PortalRepository for InMemoryRepository {
    async fn get_profile(&self, id: ProfileId) -> Result<Option<Profile>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.profiles.get(&id).cloned())
    }

    async fn put_profile(&self, profile: Profile) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        tables.profiles.insert(profile.id, profile);
        Ok(())
    }

    async fn get_request(&self, id: RequestId) -> Result<Option<SkRequest>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.requests.get(&id).cloned())
    }

    async fn active_request(
        &self,
        chapter: ProfileId,
    ) -> Result<Option<SkRequest>, RepositoryError> {
        let tables = self.tables.read().await;
        let found = tables
            .chapter_requests(chapter)
            .find(|r| r.is_active())
            .cloned();
        Ok(found)
    }

    async fn latest_request(
        &self,
        chapter: ProfileId,
    ) -> Result<Option<SkRequest>, RepositoryError> {
        let tables = self.tables.read().await;
        let found = tables
            .chapter_requests(chapter)
            .max_by_key(|r| (r.created_at, tables.created_seq.get(&r.id).copied()))
            .cloned();
        Ok(found)
    }

    async fn create_request(&self, mut request: SkRequest) -> Result<SkRequest, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.requests.contains_key(&request.id) {
            return Err(RepositoryError::RequestExists { id: request.id });
        }
        if request.is_active()
            && tables
                .chapter_requests(request.chapter_id)
                .any(|r| r.is_active())
        {
            return Err(RepositoryError::ActiveRequestExists {
                chapter: request.chapter_id,
            });
        }
        request.version = 1;
        let seq = tables.next_seq;
        tables.next_seq += 1;
        tables.created_seq.insert(request.id, seq);
        tables.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn apply_update(&self, update: RequestUpdate) -> Result<SkRequest, RepositoryError> {
        let mut tables = self.tables.write().await;
        let RequestUpdate {
            mut request,
            expected_version,
            roster,
            history,
        } = update;

        let current = tables
            .requests
            .get(&request.id)
            .ok_or(RepositoryError::RequestNotFound { id: request.id })?;
        if current.version != expected_version {
            return Err(RepositoryError::VersionConflict {
                id: request.id,
                expected: expected_version,
            });
        }

        request.version = expected_version + 1;
        tables.requests.insert(request.id, request.clone());
        if let Some(mut roster) = roster {
            roster.sort_by_key(|o| o.position);
            tables.officers.insert(request.id, roster);
        }
        if !history.is_empty() {
            tables
                .history
                .entry(request.id)
                .or_default()
                .extend(history);
        }
        Ok(request)
    }

    async fn list_requests(&self) -> Result<Vec<RequestListing>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut listings: Vec<RequestListing> = tables
            .requests
            .values()
            .map(|request| {
                let profile = tables.profiles.get(&request.chapter_id);
                RequestListing {
                    request: request.clone(),
                    chapter_name: profile.map(|p| p.full_name.clone()).unwrap_or_default(),
                    region: profile.and_then(|p| p.region.clone()),
                }
            })
            .collect();
        listings.sort_by(|a, b| b.request.updated_at.cmp(&a.request.updated_at));
        Ok(listings)
    }

    async fn officers(&self, request: RequestId) -> Result<Vec<Officer>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.officers.get(&request).cloned().unwrap_or_default())
    }

    async fn history(&self, request: RequestId) -> Result<Vec<HistoryEntry>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.history.get(&request).cloned().unwrap_or_default())
    }

    async fn custom_titles(&self, chapter: ProfileId) -> Result<Vec<CustomTitle>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .custom_titles
            .get(&chapter)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_custom_title(
        &self,
        chapter: ProfileId,
        title: CustomTitle,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let titles = tables.custom_titles.entry(chapter).or_default();
        if titles
            .iter()
            .any(|t| t.structure == title.structure && t.title.eq_ignore_ascii_case(&title.title))
        {
            return Err(RepositoryError::DuplicateTitle { title: title.title });
        }
        titles.push(title);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::contract;
    use super::*;

    #[tokio::test]
    async fn test_contract() {
        let repo = InMemoryRepository::new();
        contract::run_all(&repo).await;
    }

    #[tokio::test]
    async fn test_unknown_chapter_lists_with_empty_name() {
        let repo = InMemoryRepository::new();
        let request = contract::draft_for(ProfileId::new());
        repo.create_request(request.clone()).await.unwrap();
        let listings = repo.list_requests().await.unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].chapter_name, "");
        assert_eq!(listings[0].region, None);
    }
}
