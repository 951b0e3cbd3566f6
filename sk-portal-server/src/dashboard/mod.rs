//! Reviewer dashboard: filtered request listing with summary counts.

use serde::{Deserialize, Serialize};

use crate::repository::RequestListing;
use sk_portal_core::RequestStatus;

/// Filters accepted by the listing. All are optional and combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    /// Exact region match (case-insensitive).
    pub region: Option<String>,
    /// Free text matched against chapter name, region and meeting location.
    pub q: Option<String>,
}

impl RequestFilter {
    pub fn matches(&self, listing: &RequestListing) -> bool {
        if let Some(status) = self.status {
            if listing.request.status != status {
                return false;
            }
        }
        if let Some(region) = self.region.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            let same_region = listing
                .region
                .as_deref()
                .is_some_and(|r| r.eq_ignore_ascii_case(region));
            if !same_region {
                return false;
            }
        }
        if let Some(q) = self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let needle = q.to_lowercase();
            let haystacks = [
                Some(listing.chapter_name.as_str()),
                listing.region.as_deref(),
                Some(listing.request.meeting_location.as_str()),
            ];
            if !haystacks
                .into_iter()
                .flatten()
                .any(|h| h.to_lowercase().contains(&needle))
            {
                return false;
            }
        }
        true
    }
}

/// Summary statistics for the dashboard header.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub total: usize,
    /// Submitted and waiting for the verifier.
    pub awaiting_verification: usize,
    /// Verified or approved at some tier, not yet issued.
    pub in_progress: usize,
    pub completed: usize,
}

impl DashboardSummary {
    pub fn from_listings(listings: &[RequestListing]) -> Self {
        let mut summary = DashboardSummary {
            total: listings.len(),
            ..Default::default()
        };
        for listing in listings {
            match listing.request.status {
                RequestStatus::Submitted => summary.awaiting_verification += 1,
                RequestStatus::Verified
                | RequestStatus::Tier1Approved
                | RequestStatus::Tier2Approved => summary.in_progress += 1,
                RequestStatus::DecreeIssued => summary.completed += 1,
                RequestStatus::Draft
                | RequestStatus::VerificationRejected
                | RequestStatus::Tier1Rejected
                | RequestStatus::Tier2Rejected => {}
            }
        }
        summary
    }
}

/// Full dashboard payload.
#[derive(Debug, Serialize)]
pub struct DashboardData {
    /// Counts over all requests, independent of the filter.
    pub summary: DashboardSummary,
    pub requests: Vec<RequestListing>,
}

impl DashboardData {
    pub fn from_listings(listings: Vec<RequestListing>, filter: &RequestFilter) -> Self {
        let summary = DashboardSummary::from_listings(&listings);
        let requests = listings.into_iter().filter(|l| filter.matches(l)).collect();
        Self { summary, requests }
    }
}
