// handlers/protected/profiles.rs - GET /api/profiles (admin pickers)

use axum::{extract::State, Extension};

use crate::app::AppState;
use crate::database::models::ProfileSummary;
use crate::middleware::{ApiResponse, ApiResult};
use crate::session::Session;

pub async fn list(State(state): State<AppState>, Extension(session): Extension<Session>) -> ApiResult<Vec<ProfileSummary>> {
    Ok(ApiResponse::success(state.projects.profiles_except(&session).await?))
}
