//! Domain error types.
//!
//! Every error carries an [`ErrorKind`] so callers can map it onto the
//! portal-wide taxonomy without matching on individual variants.

use serde::Serialize;
use std::fmt;

use crate::structure::StructureCategory;
use crate::workflow::{Decision, RequestStatus, Role};

/// Portal-wide error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Authorization,
    NotFound,
    Conflict,
    Upstream,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::Authorization => "authorization",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Upstream => "upstream",
        };
        f.write_str(name)
    }
}

/// Input failed a domain rule. Detected before any mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("{document} must be one of: {allowed}")]
    UnsupportedFileType {
        document: &'static str,
        allowed: &'static str,
    },

    #[error("{document} exceeds the {limit_mib} MiB limit")]
    FileTooLarge {
        document: &'static str,
        limit_mib: u64,
    },

    #[error(
        "female representation is {female} of {total}; add at least {shortfall} more female officer(s) to reach 30%"
    )]
    QuotaNotMet {
        female: u32,
        total: u32,
        shortfall: u32,
    },

    #[error("the roster must contain at least one officer")]
    EmptyRoster,

    #[error("\"{title}\" is not a title for {structure}")]
    UnknownTitle {
        structure: StructureCategory,
        title: String,
    },

    #[error("a bureau must be selected for {structure}")]
    MissingBureau { structure: StructureCategory },

    #[error("{structure} does not take a bureau selection")]
    UnexpectedBureau { structure: StructureCategory },

    #[error("officer position {position} is out of range")]
    PositionOutOfRange { position: usize },

    #[error("title \"{title}\" already exists for {structure}")]
    DuplicateTitle {
        structure: StructureCategory,
        title: String,
    },

    #[error("document {key} does not belong to this request")]
    ForeignDocument { key: String },

    #[error("officer {position}: {source}")]
    Officer {
        position: usize,
        #[source]
        source: Box<ValidationError>,
    },
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }

    /// Wraps an error with the position of the officer it came from.
    pub fn for_officer(self, position: usize) -> Self {
        Self::Officer {
            position,
            source: Box::new(self),
        }
    }
}

/// A transition was refused. The request is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("{role} cannot {decision} a request that is {status}")]
    NotPermitted {
        role: Role,
        status: RequestStatus,
        decision: Decision,
    },

    #[error("request is {status}; no further transitions are possible")]
    Terminal { status: RequestStatus },

    #[error("a revision note is required to reject a request")]
    MissingNote,
}

impl TransitionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotPermitted { .. } | Self::Terminal { .. } => ErrorKind::Authorization,
            Self::MissingNote => ErrorKind::Validation,
        }
    }
}
