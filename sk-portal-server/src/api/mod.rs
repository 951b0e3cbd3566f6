//! HTTP routes of the portal.
//!
//! Everything except `/health` and `/blobs` requires a caller identity,
//! resolved by [`identity::resolve_identity`] from the gateway header.
//! Document downloads authenticate with the URL signature instead.

mod handlers;
pub mod identity;
pub mod types;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::AppState;

pub use identity::PROFILE_HEADER;

/// Upper bound for JSON bodies. Documents travel base64-encoded inside them.
pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Routes that act on behalf of a profile.
pub fn portal_router(middleware_state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/requests", get(handlers::list_requests))
        .route("/requests/mine", get(handlers::my_request))
        .route(
            "/requests/mine/meeting-report",
            put(handlers::save_meeting_report),
        )
        .route("/requests/{id}", get(handlers::request_detail))
        .route(
            "/requests/{id}/meeting-report",
            delete(handlers::remove_meeting_report),
        )
        .route("/requests/{id}/roster", post(handlers::submit_roster))
        .route("/requests/{id}/decisions", post(handlers::decide))
        .route(
            "/requests/{id}/documents/meeting-report",
            get(handlers::meeting_report_url),
        )
        .route(
            "/requests/{id}/officers/{position}/document",
            get(handlers::officer_document_url),
        )
        .route(
            "/titles",
            get(handlers::list_titles).post(handlers::register_title),
        )
        .route_layer(middleware::from_fn_with_state(
            middleware_state,
            identity::resolve_identity,
        ))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

/// The complete application without transport layers.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/blobs/{bucket}/{*key}", get(handlers::read_blob))
        .merge(portal_router(state.clone()))
        .with_state(state)
}
