//! `/api/v1/admin/members` handlers. Every route requires an admin token.

use super::error::ApiError;
use super::extract::{AdminUser, ApiJson, ApiPath, ApiQuery};
use super::{AppState, blocking};
use axum::extract::State;
use axum::routing::{get, patch};
use axum::{Json, Router};
use stce_core::admin::{SearchQuery, UpdateMemberRequest};
use stce_core::model::MemberProfile;
use stce_core::{Success, UserId};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/search", get(search))
        .route("/{id}", patch(update).delete(remove))
}

async fn search(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<Vec<MemberProfile>>, ApiError> {
    let admin = state.admin.clone();
    Ok(Json(blocking(move || admin.search(&query)).await?))
}

async fn update(
    State(state): State<AppState>,
    AdminUser(actor): AdminUser,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(req): ApiJson<UpdateMemberRequest>,
) -> Result<Json<MemberProfile>, ApiError> {
    let admin = state.admin.clone();
    let profile = blocking(move || admin.update(id, req)).await?;
    tracing::info!(by = %actor.username, member = %id, "member updated");
    Ok(Json(profile))
}

async fn remove(
    State(state): State<AppState>,
    AdminUser(actor): AdminUser,
    ApiPath(id): ApiPath<UserId>,
) -> Result<Json<Success>, ApiError> {
    let admin = state.admin.clone();
    blocking(move || admin.remove(id)).await?;
    tracing::info!(by = %actor.username, member = %id, "member removed");
    Ok(Json(Success::OK))
}
