// handlers/public/portfolio.rs - showcase grid and contact form

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::app::AppState;
use crate::database::models::{ContactForm, ContactSubmission, ShowcaseProject};
use crate::middleware::{ApiResponse, ApiResult};

/// GET /api/portfolio/projects - active showcase entries; empty when the store fails
pub async fn showcase(State(state): State<AppState>) -> ApiResult<Vec<ShowcaseProject>> {
    Ok(ApiResponse::success(state.portfolio.showcase().await))
}

/// POST /api/contact - store a contact submission
pub async fn contact(
    State(state): State<AppState>,
    payload: Result<Json<ContactForm>, JsonRejection>,
) -> ApiResult<ContactSubmission> {
    let Json(form) = payload?;
    let submission = state.portfolio.submit_contact(form).await?;
    Ok(ApiResponse::created(submission))
}
