//! Pure state transition function.
//!
//! `next_status` is the single source of truth for who may do what. The
//! transition function, the capability predicates used to decide which
//! actions a client offers, and the printable table are all derived from it.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::effect::{Effect, HistoryEntry, LogLevel};
use super::state::{Actor, Decision, RequestStatus, Role, SkRequest};
use crate::error::TransitionError;

/// Looks up the status a (role, status, decision) triple leads to.
///
/// Returns `None` for every triple that is not a legal transition.
pub fn next_status(role: Role, status: RequestStatus, decision: Decision) -> Option<RequestStatus> {
    use RequestStatus as S;

    match (role, status, decision) {
        (
            Role::RegionalFiler,
            S::Draft | S::VerificationRejected | S::Tier1Rejected | S::Tier2Rejected,
            Decision::Submit,
        ) => Some(S::Submitted),

        (Role::Verifier, S::Submitted, Decision::Approve) => Some(S::Verified),
        (Role::Verifier, S::Submitted, Decision::Reject) => Some(S::VerificationRejected),

        (Role::Tier1Approver, S::Verified, Decision::Approve) => Some(S::Tier1Approved),
        (Role::Tier1Approver, S::Verified, Decision::Reject) => Some(S::Tier1Rejected),

        (Role::Tier2Approver, S::Tier1Approved, Decision::Approve) => Some(S::Tier2Approved),
        (Role::Tier2Approver, S::Tier1Approved, Decision::Reject) => Some(S::Tier2Rejected),
        (Role::Tier2Approver, S::Tier2Approved, Decision::Issue) => Some(S::DecreeIssued),

        _ => None,
    }
}

/// One row of the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransitionRule {
    pub role: Role,
    pub from: RequestStatus,
    pub decision: Decision,
    pub to: RequestStatus,
}

/// Enumerates every legal transition.
pub fn transition_table() -> Vec<TransitionRule> {
    let mut rules = Vec::new();
    for role in Role::ALL {
        for from in RequestStatus::ALL {
            for decision in Decision::ALL {
                if let Some(to) = next_status(role, from, decision) {
                    rules.push(TransitionRule {
                        role,
                        from,
                        decision,
                        to,
                    });
                }
            }
        }
    }
    rules
}

/// Decisions `role` may apply to a request in `status`.
pub fn allowed_decisions(role: Role, status: RequestStatus) -> Vec<Decision> {
    Decision::ALL
        .into_iter()
        .filter(|decision| next_status(role, status, *decision).is_some())
        .collect()
}

/// True when `role` may approve or reject a request in `status`.
pub fn can_decide(role: Role, status: RequestStatus) -> bool {
    next_status(role, status, Decision::Approve).is_some()
        && next_status(role, status, Decision::Reject).is_some()
}

/// True when `role` may issue the decree for a request in `status`.
pub fn can_issue_decree(role: Role, status: RequestStatus) -> bool {
    next_status(role, status, Decision::Issue).is_some()
}

/// True when `role` may hand a request in `status` over for review.
pub fn can_submit(role: Role, status: RequestStatus) -> bool {
    next_status(role, status, Decision::Submit).is_some()
}

/// Capability flags for one (role, status) pair, as sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub can_decide: bool,
    pub can_issue_decree: bool,
    pub can_submit: bool,
    pub can_edit: bool,
    /// Every decision the viewer may send, in table order.
    pub decisions: Vec<Decision>,
}

impl Capabilities {
    pub fn derive(role: Role, status: RequestStatus) -> Self {
        Self {
            can_decide: can_decide(role, status),
            can_issue_decree: can_issue_decree(role, status),
            can_submit: can_submit(role, status),
            can_edit: role == Role::RegionalFiler && status.is_editable(),
            decisions: allowed_decisions(role, status),
        }
    }
}

/// Result of a state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    /// The request after the transition. Its `version` is unchanged; the
    /// store bumps it when the update is written.
    pub request: SkRequest,
    /// Effects to execute.
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(request: SkRequest, effects: Vec<Effect>) -> Self {
        Self { request, effects }
    }

    /// Returns the history entries among the effects.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::AppendHistory(entry) => Some(entry.clone()),
                Effect::Log { .. } => None,
            })
            .collect()
    }
}

/// Applies `decision` by `actor` to `request`.
///
/// The input request is never modified. On error nothing has changed; on
/// success the returned request carries the new status, the stamps for the
/// stage that was approved, and the revision note if this was a rejection.
pub fn transition(
    request: &SkRequest,
    actor: &Actor,
    decision: Decision,
    note: Option<&str>,
    at: DateTime<Utc>,
) -> Result<TransitionResult, TransitionError> {
    let from = request.status;
    if from.is_terminal() {
        return Err(TransitionError::Terminal { status: from });
    }

    let to = next_status(actor.role, from, decision).ok_or(TransitionError::NotPermitted {
        role: actor.role,
        status: from,
        decision,
    })?;

    let note = note.map(str::trim).filter(|n| !n.is_empty());
    if decision == Decision::Reject && note.is_none() {
        return Err(TransitionError::MissingNote);
    }

    let mut next = request.clone();
    next.status = to;
    next.updated_at = at;
    next.revision_note = match decision {
        Decision::Reject => note.map(str::to_string),
        Decision::Submit | Decision::Approve | Decision::Issue => None,
    };

    match to {
        RequestStatus::Verified => {
            next.verified_by = Some(actor.id);
            next.verified_at = Some(at);
        }
        RequestStatus::Tier1Approved => {
            next.tier1_approved_by = Some(actor.id);
            next.tier1_approved_at = Some(at);
        }
        RequestStatus::Tier2Approved => {
            next.tier2_approved_by = Some(actor.id);
            next.tier2_approved_at = Some(at);
        }
        RequestStatus::DecreeIssued => {
            next.decree_issued_at = Some(at);
        }
        _ => {}
    }

    let entry = HistoryEntry {
        request_id: request.id,
        actor_id: actor.id,
        role: actor.role,
        decision,
        from_status: from,
        to_status: to,
        note: next.revision_note.clone(),
        recorded_at: at,
    };

    let effects = vec![
        Effect::AppendHistory(entry),
        Effect::Log {
            level: match decision {
                Decision::Reject => LogLevel::Warn,
                Decision::Submit | Decision::Approve | Decision::Issue => LogLevel::Info,
            },
            message: format!(
                "request {} moved {} -> {} ({} by {})",
                request.id, from, to, decision, actor.role
            ),
        },
    ];

    Ok(TransitionResult::new(next, effects))
}
