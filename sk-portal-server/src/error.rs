//! Service error type and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

use crate::blob::{BlobError, SignatureError};
use crate::repository::RepositoryError;
use sk_portal_core::{ErrorKind, TransitionError, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Blob(#[from] BlobError),

    #[error(transparent)]
    Signature(#[from] SignatureError),
}

impl PortalError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(e) => e.kind(),
            Self::Transition(e) => e.kind(),
            Self::Forbidden(_) | Self::Signature(_) => ErrorKind::Authorization,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::BadRequest(_) => ErrorKind::Validation,
            Self::Repository(e) => e.kind(),
            Self::Blob(e) => e.kind(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Authorization => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        if kind == ErrorKind::Upstream {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected ({}): {}", kind, self);
        }
        let body = json!({
            "error": kind,
            "message": self.to_string(),
        });
        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sk_portal_core::{Decision, RequestId, RequestStatus, Role};

    #[test]
    fn test_status_codes() {
        let cases: Vec<(PortalError, StatusCode)> = vec![
            (
                ValidationError::EmptyRoster.into(),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (TransitionError::MissingNote.into(), StatusCode::UNPROCESSABLE_ENTITY),
            (
                TransitionError::NotPermitted {
                    role: Role::Verifier,
                    status: RequestStatus::Draft,
                    decision: Decision::Approve,
                }
                .into(),
                StatusCode::FORBIDDEN,
            ),
            (PortalError::not_found("request"), StatusCode::NOT_FOUND),
            (
                RepositoryError::VersionConflict {
                    id: RequestId::new(),
                    expected: 3,
                }
                .into(),
                StatusCode::CONFLICT,
            ),
            (
                RepositoryError::storage("get request", "disk I/O error").into(),
                StatusCode::BAD_GATEWAY,
            ),
            (SignatureError::Expired.into(), StatusCode::FORBIDDEN),
        ];
        for (err, expected) in cases {
            assert_eq!(err.status_code(), expected, "{}", err);
        }
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(
            PortalError::not_found("meeting report").to_string(),
            "meeting report not found"
        );
    }
}
