//! Filer-facing progress view of a request.

use serde::Serialize;

use super::state::RequestStatus;

/// The five steps shown on the progress tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStep {
    Upload,
    Verification,
    Tier1Approval,
    Tier2Approval,
    Issuance,
}

impl ProgressStep {
    pub const ALL: [ProgressStep; 5] = [
        Self::Upload,
        Self::Verification,
        Self::Tier1Approval,
        Self::Tier2Approval,
        Self::Issuance,
    ];

    /// Index of the step in the approval chain.
    fn rank(&self) -> u8 {
        match self {
            Self::Upload => 0,
            Self::Verification => 1,
            Self::Tier1Approval => 2,
            Self::Tier2Approval => 3,
            Self::Issuance => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Pending,
    Current,
    Completed,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepProgress {
    pub step: ProgressStep,
    pub state: StepState,
}

/// Rough completion percentage for the progress bar.
pub fn progress_percent(status: RequestStatus) -> u8 {
    match status {
        RequestStatus::Draft => 10,
        RequestStatus::Submitted => 25,
        RequestStatus::Verified => 50,
        RequestStatus::VerificationRejected => 25,
        RequestStatus::Tier1Approved => 75,
        RequestStatus::Tier1Rejected => 50,
        RequestStatus::Tier2Approved => 90,
        RequestStatus::Tier2Rejected => 75,
        RequestStatus::DecreeIssued => 100,
    }
}

/// The step a status belongs to, and whether it was a rejection there.
fn position(status: RequestStatus) -> (ProgressStep, Option<StepState>) {
    match status {
        RequestStatus::Draft => (ProgressStep::Upload, None),
        RequestStatus::Submitted => (ProgressStep::Upload, Some(StepState::Current)),
        RequestStatus::Verified => (ProgressStep::Verification, Some(StepState::Current)),
        RequestStatus::VerificationRejected => {
            (ProgressStep::Verification, Some(StepState::Rejected))
        }
        RequestStatus::Tier1Approved => (ProgressStep::Tier1Approval, Some(StepState::Current)),
        RequestStatus::Tier1Rejected => (ProgressStep::Tier1Approval, Some(StepState::Rejected)),
        RequestStatus::Tier2Approved => (ProgressStep::Tier2Approval, Some(StepState::Current)),
        RequestStatus::Tier2Rejected => (ProgressStep::Tier2Approval, Some(StepState::Rejected)),
        RequestStatus::DecreeIssued => (ProgressStep::Issuance, Some(StepState::Completed)),
    }
}

/// State of every step for a request in `status`.
///
/// Steps before the one the status sits on are completed, steps after it
/// pending. A draft has not completed the upload step yet.
pub fn step_states(status: RequestStatus) -> Vec<StepProgress> {
    let (at, state_here) = position(status);
    ProgressStep::ALL
        .into_iter()
        .map(|step| {
            let state = if step.rank() < at.rank() {
                StepState::Completed
            } else if step.rank() > at.rank() {
                StepState::Pending
            } else {
                state_here.unwrap_or(StepState::Pending)
            };
            StepProgress { step, state }
        })
        .collect()
}
