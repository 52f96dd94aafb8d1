//! `/auth` handlers.

use super::error::ApiError;
use super::extract::ApiJson;
use super::{AppState, blocking};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use stce_core::AuthResponse;
use stce_core::auth::{LoginRequest, RegisterRequest};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let auth = state.auth.clone();
    let username = req.username.clone();
    let response = blocking(move || auth.register(req)).await?;
    tracing::info!(%username, id = %response.user.id, "member registered");
    Ok((StatusCode::CREATED, Json(response)))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let auth = state.auth.clone();
    Ok(Json(blocking(move || auth.login(req)).await?))
}
