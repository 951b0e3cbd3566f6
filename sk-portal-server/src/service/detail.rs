use serde::Serialize;

use crate::repository::Profile;
use sk_portal_core::{
    progress_percent, step_states, Capabilities, HistoryEntry, Officer, QuotaSummary, Role,
    SkRequest, StepProgress,
};

/// Everything a detail page shows for one request, already filtered to what
/// the viewer may do.
#[derive(Debug, Clone, Serialize)]
pub struct RequestDetail {
    pub request: SkRequest,
    pub chapter_name: Option<String>,
    pub region: Option<String>,
    pub officers: Vec<Officer>,
    pub quota: QuotaSummary,
    pub history: Vec<HistoryEntry>,
    pub capabilities: Capabilities,
    pub progress_percent: u8,
    pub steps: Vec<StepProgress>,
}

impl RequestDetail {
    pub fn build(
        viewer: Role,
        request: SkRequest,
        chapter: Option<Profile>,
        officers: Vec<Officer>,
        history: Vec<HistoryEntry>,
    ) -> Self {
        let status = request.status;
        Self {
            quota: QuotaSummary::of(&officers),
            capabilities: Capabilities::derive(viewer, status),
            progress_percent: progress_percent(status),
            steps: step_states(status),
            chapter_name: chapter.as_ref().map(|c| c.full_name.clone()),
            region: chapter.and_then(|c| c.region),
            request,
            officers,
            history,
        }
    }
}
