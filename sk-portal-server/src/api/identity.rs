use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::debug;
use uuid::Uuid;

use crate::error::PortalError;
use crate::AppState;
use sk_portal_core::ProfileId;

/// Header the gateway sets after authenticating the caller.
pub const PROFILE_HEADER: &str = "x-profile-id";

/// Resolves the caller's profile and stores it in the request extensions.
pub async fn resolve_identity(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, PortalError> {
    let raw = request
        .headers()
        .get(PROFILE_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| PortalError::forbidden("missing X-Profile-Id header"))?;
    let id = Uuid::parse_str(raw.trim())
        .map_err(|_| PortalError::forbidden("malformed X-Profile-Id header"))?;

    let profile = state.portal.resolve_profile(ProfileId(id)).await?;
    debug!("Request from {} ({})", profile.id, profile.role);
    request.extensions_mut().insert(profile);

    Ok(next.run(request).await)
}
