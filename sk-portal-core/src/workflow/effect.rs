//! Effects (side effects as data).
//!
//! The transition function never writes anywhere. It describes what should
//! be recorded, and the server decides how: history entries are written in
//! the same storage transaction as the request update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::{Decision, ProfileId, RequestId, RequestStatus, Role};

/// One applied transition, kept for the request timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub request_id: RequestId,
    pub actor_id: ProfileId,
    pub role: Role,
    pub decision: Decision,
    pub from_status: RequestStatus,
    pub to_status: RequestStatus,
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Warn,
}

/// All effects that can be produced by a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Append an entry to the request history.
    AppendHistory(HistoryEntry),

    /// Log a message.
    Log { level: LogLevel, message: String },
}

impl Effect {
    /// Returns true if this effect must be committed with the request update.
    pub fn is_persistent(&self) -> bool {
        matches!(self, Effect::AppendHistory(_))
    }
}
