use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::types::{
    BlobQuery, DecisionBody, MeetingReportBody, NewTitleBody, RosterBody, TitleList, TitleQuery,
};
use crate::blob::{Bucket, SignedUrl};
use crate::dashboard::{DashboardData, RequestFilter};
use crate::error::PortalError;
use crate::repository::Profile;
use crate::service::{DocumentRef, RequestDetail};
use crate::AppState;
use sk_portal_core::{CustomTitle, RequestId, SkRequest};

pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "sk-portal"
    }))
}

pub async fn list_requests(
    State(state): State<Arc<AppState>>,
    Extension(profile): Extension<Profile>,
    Query(filter): Query<RequestFilter>,
) -> Result<Json<DashboardData>, PortalError> {
    Ok(Json(state.portal.dashboard(&profile, &filter).await?))
}

pub async fn my_request(
    State(state): State<Arc<AppState>>,
    Extension(profile): Extension<Profile>,
) -> Result<Json<RequestDetail>, PortalError> {
    state
        .portal
        .my_request(&profile)
        .await?
        .map(Json)
        .ok_or_else(|| PortalError::not_found("request for this chapter"))
}

pub async fn save_meeting_report(
    State(state): State<Arc<AppState>>,
    Extension(profile): Extension<Profile>,
    Json(body): Json<MeetingReportBody>,
) -> Result<Json<SkRequest>, PortalError> {
    let (meeting, upload) = body.into_parts()?;
    let saved = state
        .portal
        .save_meeting_report(&profile, meeting, upload)
        .await?;
    Ok(Json(saved))
}

pub async fn remove_meeting_report(
    State(state): State<Arc<AppState>>,
    Extension(profile): Extension<Profile>,
    Path(id): Path<Uuid>,
) -> Result<Json<SkRequest>, PortalError> {
    let saved = state
        .portal
        .remove_meeting_report(&profile, RequestId(id))
        .await?;
    Ok(Json(saved))
}

pub async fn request_detail(
    State(state): State<Arc<AppState>>,
    Extension(profile): Extension<Profile>,
    Path(id): Path<Uuid>,
) -> Result<Json<RequestDetail>, PortalError> {
    Ok(Json(
        state.portal.request_detail(&profile, RequestId(id)).await?,
    ))
}

pub async fn submit_roster(
    State(state): State<Arc<AppState>>,
    Extension(profile): Extension<Profile>,
    Path(id): Path<Uuid>,
    Json(body): Json<RosterBody>,
) -> Result<Json<SkRequest>, PortalError> {
    // Role and ownership are settled before the roster is built.
    let custom = state.portal.roster_titles(&profile, RequestId(id)).await?;
    let expected_version = body.expected_version;
    let draft = body.into_draft(&custom)?;
    let officers = draft.len();
    let saved = state
        .portal
        .submit_roster(&profile, RequestId(id), expected_version, draft)
        .await?;
    info!(
        "Request {} submitted with {} officer(s)",
        saved.id, officers
    );
    Ok(Json(saved))
}

pub async fn decide(
    State(state): State<Arc<AppState>>,
    Extension(profile): Extension<Profile>,
    Path(id): Path<Uuid>,
    Json(body): Json<DecisionBody>,
) -> Result<Json<SkRequest>, PortalError> {
    let saved = state
        .portal
        .decide(
            &profile,
            RequestId(id),
            body.expected_version,
            body.decision,
            body.note.as_deref(),
        )
        .await?;
    Ok(Json(saved))
}

pub async fn meeting_report_url(
    State(state): State<Arc<AppState>>,
    Extension(profile): Extension<Profile>,
    Path(id): Path<Uuid>,
) -> Result<Json<SignedUrl>, PortalError> {
    let url = state
        .portal
        .document_url(&profile, RequestId(id), DocumentRef::MeetingReport)
        .await?;
    Ok(Json(url))
}

pub async fn officer_document_url(
    State(state): State<Arc<AppState>>,
    Extension(profile): Extension<Profile>,
    Path((id, position)): Path<(Uuid, u32)>,
) -> Result<Json<SignedUrl>, PortalError> {
    let url = state
        .portal
        .document_url(
            &profile,
            RequestId(id),
            DocumentRef::OfficerDocument { position },
        )
        .await?;
    Ok(Json(url))
}

pub async fn list_titles(
    State(state): State<Arc<AppState>>,
    Extension(profile): Extension<Profile>,
    Query(query): Query<TitleQuery>,
) -> Result<Json<TitleList>, PortalError> {
    let titles = state.portal.list_titles(&profile, query.structure).await?;
    Ok(Json(TitleList {
        structure: query.structure,
        titles,
    }))
}

pub async fn register_title(
    State(state): State<Arc<AppState>>,
    Extension(profile): Extension<Profile>,
    Json(body): Json<NewTitleBody>,
) -> Result<(StatusCode, Json<CustomTitle>), PortalError> {
    let title = state
        .portal
        .register_custom_title(&profile, body.structure, &body.title)
        .await?;
    Ok((StatusCode::CREATED, Json(title)))
}

/// Serves a document to whoever holds a valid signed URL.
pub async fn read_blob(
    State(state): State<Arc<AppState>>,
    Path((bucket, key)): Path<(String, String)>,
    Query(query): Query<BlobQuery>,
) -> Result<Response, PortalError> {
    let bucket: Bucket = bucket.parse()?;
    let blob = state
        .portal
        .read_blob(bucket, &key, query.expires, &query.signature)
        .await?;
    Ok(([(header::CONTENT_TYPE, blob.content_type)], blob.bytes).into_response())
}
