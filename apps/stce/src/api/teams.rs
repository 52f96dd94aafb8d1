//! `/api/v1/teams` handlers.

use super::error::ApiError;
use super::extract::{ApiJson, ApiPath, AuthUser};
use super::{AppState, blocking};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use stce_core::model::{TeamMemberView, TeamView};
use stce_core::teams::{ApplyTeamRequest, CreateTeamRequest, UpdateTeamRequest, UpdateTeamStatusRequest};
use stce_core::{Success, TeamId};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(find_all).post(create))
        .route("/{id}", get(find_one).patch(update).delete(remove))
        .route("/{id}/status", patch(change_status))
        .route("/{id}/apply", post(apply).delete(cancel_apply))
}

async fn create(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiJson(req): ApiJson<CreateTeamRequest>,
) -> Result<(StatusCode, Json<TeamView>), ApiError> {
    let svc = state.teams.clone();
    let team = blocking(move || svc.create(actor.id, req)).await?;
    tracing::info!(team = %team.id, leader = %actor.username, "team created");
    Ok((StatusCode::CREATED, Json(team)))
}

async fn find_all(State(state): State<AppState>) -> Result<Json<Vec<TeamView>>, ApiError> {
    let svc = state.teams.clone();
    Ok(Json(blocking(move || svc.find_all()).await?))
}

async fn find_one(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<TeamId>,
) -> Result<Json<TeamView>, ApiError> {
    let svc = state.teams.clone();
    Ok(Json(blocking(move || svc.find_one(id)).await?))
}

async fn update(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<TeamId>,
    ApiJson(req): ApiJson<UpdateTeamRequest>,
) -> Result<Json<TeamView>, ApiError> {
    let svc = state.teams.clone();
    Ok(Json(blocking(move || svc.update(actor.id, id, req)).await?))
}

async fn remove(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<TeamId>,
) -> Result<StatusCode, ApiError> {
    let svc = state.teams.clone();
    blocking(move || svc.remove(actor.id, id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn change_status(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<TeamId>,
    ApiJson(req): ApiJson<UpdateTeamStatusRequest>,
) -> Result<Json<TeamView>, ApiError> {
    let svc = state.teams.clone();
    Ok(Json(
        blocking(move || svc.change_status(actor.id, id, req.status)).await?,
    ))
}

async fn apply(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<TeamId>,
    ApiJson(req): ApiJson<ApplyTeamRequest>,
) -> Result<(StatusCode, Json<TeamMemberView>), ApiError> {
    let svc = state.teams.clone();
    let member = blocking(move || svc.apply(actor.id, id, req)).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

async fn cancel_apply(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<TeamId>,
) -> Result<Json<Success>, ApiError> {
    let svc = state.teams.clone();
    blocking(move || svc.cancel_apply(actor.id, id)).await?;
    Ok(Json(Success::OK))
}
