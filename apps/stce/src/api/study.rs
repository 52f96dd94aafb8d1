//! `/api/v1/study` handlers.
//!
//! Only the list is public. The core service decides between admin, manager
//! and participant access for everything else.

use super::error::ApiError;
use super::extract::{ApiJson, ApiPath, ApiQuery, AuthUser};
use super::{AppState, blocking};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, patch};
use axum::{Json, Router};
use stce_core::model::{
    AvailableMember, ProgressView, ResourceView, StudyDetail, StudyMember, StudySummary,
};
use stce_core::study::{
    AddMemberRequest, AvailableMembersQuery, CreateProgressRequest, CreateStudyRequest,
    StudyListQuery, UpdateLeaderRequest, UpdateProgressRequest, Upload,
};
use stce_core::{Created, ProgressId, ResourceId, StudyId, Success, UserId};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(find_all).post(create))
        .route("/{id}", get(find_by_id).patch(update_leader).delete(remove))
        .route("/{id}/members", get(find_members).post(add_member))
        .route("/{id}/members/{user_id}", delete(remove_member))
        .route("/{id}/available-members", get(available_members))
        .route("/{id}/progress", get(find_progress).post(create_progress))
        .route(
            "/{id}/progress/{progress_id}",
            patch(update_progress).delete(delete_progress),
        )
        .route("/{id}/resources", get(find_resources).post(upload_resource))
        .route("/{id}/resources/{resource_id}", delete(delete_resource))
}

// =============================================================================
// STUDIES
// =============================================================================

async fn find_all(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<StudyListQuery>,
) -> Result<Json<Vec<StudySummary>>, ApiError> {
    let svc = state.study.clone();
    Ok(Json(blocking(move || svc.find_all(&query)).await?))
}

async fn find_by_id(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<StudyId>,
) -> Result<Json<StudyDetail>, ApiError> {
    let svc = state.study.clone();
    Ok(Json(blocking(move || svc.find_by_id(id)).await?))
}

async fn create(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiJson(req): ApiJson<CreateStudyRequest>,
) -> Result<(StatusCode, Json<Created<StudyId>>), ApiError> {
    let svc = state.study.clone();
    let created = blocking(move || svc.create(&actor, req)).await?;
    tracing::info!(study = %created.id, "study created");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn remove(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<StudyId>,
) -> Result<Json<Success>, ApiError> {
    let svc = state.study.clone();
    Ok(Json(blocking(move || svc.delete(&actor, id)).await?))
}

async fn update_leader(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<StudyId>,
    ApiJson(req): ApiJson<UpdateLeaderRequest>,
) -> Result<Json<Success>, ApiError> {
    let svc = state.study.clone();
    Ok(Json(blocking(move || svc.update_leader(&actor, id, req)).await?))
}

// =============================================================================
// MEMBERS
// =============================================================================

async fn find_members(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<StudyId>,
) -> Result<Json<Vec<StudyMember>>, ApiError> {
    let svc = state.study.clone();
    Ok(Json(blocking(move || svc.find_members(&actor, id)).await?))
}

async fn add_member(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<StudyId>,
    ApiJson(req): ApiJson<AddMemberRequest>,
) -> Result<(StatusCode, Json<Success>), ApiError> {
    let svc = state.study.clone();
    let ok = blocking(move || svc.add_member(&actor, id, req)).await?;
    Ok((StatusCode::CREATED, Json(ok)))
}

async fn remove_member(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath((id, user_id)): ApiPath<(StudyId, UserId)>,
) -> Result<Json<Success>, ApiError> {
    let svc = state.study.clone();
    Ok(Json(
        blocking(move || svc.remove_member(&actor, id, user_id)).await?,
    ))
}

async fn available_members(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<StudyId>,
    ApiQuery(query): ApiQuery<AvailableMembersQuery>,
) -> Result<Json<Vec<AvailableMember>>, ApiError> {
    let svc = state.study.clone();
    Ok(Json(
        blocking(move || svc.search_available_members(&actor, id, &query)).await?,
    ))
}

// =============================================================================
// PROGRESS
// =============================================================================

async fn find_progress(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<StudyId>,
) -> Result<Json<Vec<ProgressView>>, ApiError> {
    let svc = state.study.clone();
    Ok(Json(blocking(move || svc.find_progress(&actor, id)).await?))
}

async fn create_progress(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<StudyId>,
    ApiJson(req): ApiJson<CreateProgressRequest>,
) -> Result<(StatusCode, Json<Created<ProgressId>>), ApiError> {
    let svc = state.study.clone();
    let created = blocking(move || svc.create_progress(&actor, id, req)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_progress(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath((id, progress_id)): ApiPath<(StudyId, ProgressId)>,
    ApiJson(req): ApiJson<UpdateProgressRequest>,
) -> Result<Json<Success>, ApiError> {
    let svc = state.study.clone();
    Ok(Json(
        blocking(move || svc.update_progress(&actor, id, progress_id, req)).await?,
    ))
}

async fn delete_progress(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath((id, progress_id)): ApiPath<(StudyId, ProgressId)>,
) -> Result<Json<Success>, ApiError> {
    let svc = state.study.clone();
    Ok(Json(
        blocking(move || svc.delete_progress(&actor, id, progress_id)).await?,
    ))
}

// =============================================================================
// RESOURCES
// =============================================================================

async fn find_resources(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<StudyId>,
) -> Result<Json<Vec<ResourceView>>, ApiError> {
    let svc = state.study.clone();
    Ok(Json(blocking(move || svc.find_resources(&actor, id)).await?))
}

/// Pull the `file` part out of a multipart body.
async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    let bad = |e: axum::extract::multipart::MultipartError| ApiError::BadRequest(e.body_text());
    while let Some(field) = multipart.next_field().await.map_err(bad)? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(bad)?;
        return Ok(Upload {
            file_name,
            bytes: bytes.to_vec(),
        });
    }
    Err(ApiError::BadRequest("file is required".to_string()))
}

async fn upload_resource(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<StudyId>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ResourceView>), ApiError> {
    let upload = read_upload(multipart).await?;
    let svc = state.study.clone();
    let view = blocking(move || svc.upload_resource(&actor, id, upload)).await?;
    tracing::info!(study = %id, resource = %view.id, name = %view.name, "resource uploaded");
    Ok((StatusCode::CREATED, Json(view)))
}

async fn delete_resource(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath((id, resource_id)): ApiPath<(StudyId, ResourceId)>,
) -> Result<Json<Success>, ApiError> {
    let svc = state.study.clone();
    Ok(Json(
        blocking(move || svc.delete_resource(&actor, id, resource_id)).await?,
    ))
}
