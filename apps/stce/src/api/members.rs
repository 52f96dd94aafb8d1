use super::error::ApiError;
use super::{AppState, blocking};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use stce_core::model::PublicUser;

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(public_member_list))
}

async fn public_member_list(
    State(state): State<AppState>,
) -> Result<Json<Vec<PublicUser>>, ApiError> {
    let members = state.members.clone();
    Ok(Json(blocking(move || members.public_member_list()).await?))
}
