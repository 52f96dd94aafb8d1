//! `/api/v1/announcements` handlers. Reads are public; writes need an admin.

use super::error::ApiError;
use super::extract::{AdminUser, ApiJson, ApiPath};
use super::{AppState, blocking};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use stce_core::AnnouncementId;
use stce_core::announcements::{CreateAnnouncementRequest, UpdateAnnouncementRequest};
use stce_core::model::AnnouncementView;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(find_all).post(create))
        .route("/{id}", get(find_one).patch(update).delete(remove))
}

async fn find_all(State(state): State<AppState>) -> Result<Json<Vec<AnnouncementView>>, ApiError> {
    let svc = state.announcements.clone();
    Ok(Json(blocking(move || svc.find_all()).await?))
}

async fn find_one(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AnnouncementId>,
) -> Result<Json<AnnouncementView>, ApiError> {
    let svc = state.announcements.clone();
    Ok(Json(blocking(move || svc.find_one(id)).await?))
}

async fn create(
    State(state): State<AppState>,
    AdminUser(actor): AdminUser,
    ApiJson(req): ApiJson<CreateAnnouncementRequest>,
) -> Result<(StatusCode, Json<AnnouncementView>), ApiError> {
    let svc = state.announcements.clone();
    let view = blocking(move || svc.create(req, actor.id)).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<AnnouncementId>,
    ApiJson(req): ApiJson<UpdateAnnouncementRequest>,
) -> Result<Json<AnnouncementView>, ApiError> {
    let svc = state.announcements.clone();
    Ok(Json(blocking(move || svc.update(id, req)).await?))
}

async fn remove(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<AnnouncementId>,
) -> Result<StatusCode, ApiError> {
    let svc = state.announcements.clone();
    blocking(move || svc.remove(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
