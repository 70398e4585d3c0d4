// handlers/protected/projects.rs - dashboard, create, detail, edit and phase status

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{Document, PhaseStatus, Project, ProjectSummary};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{CreateProject, EditSnapshot, EditSubmission, ProjectDetail, SaveReport};
use crate::session::Session;

#[derive(Debug, Deserialize)]
pub struct PhaseStatusBody {
    pub status: PhaseStatus,
}

/// GET /api/projects - dashboard cards, newest first
pub async fn dashboard(State(state): State<AppState>, Extension(session): Extension<Session>) -> ApiResult<Vec<ProjectSummary>> {
    Ok(ApiResponse::success(state.projects.dashboard(&session).await))
}

/// POST /api/projects - create a project with its team and phases
///
/// ```json
/// {
///   "project": { "name": "...", "description": "...", "deadline": "2030-01-31", "progress": 0 },
///   "members": [ { "user_id": "uuid", "role": "Developer" } ],
///   "phases":  [ { "name": "Design", "description": null, "status": "pending" } ]
/// }
/// ```
///
/// Incomplete member and phase rows are skipped; phase order follows the array.
pub async fn create(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    payload: Result<Json<CreateProject>, JsonRejection>,
) -> ApiResult<Project> {
    let Json(request) = payload?;
    let project = state.projects.create(&session, request).await?;
    Ok(ApiResponse::created(project))
}

/// GET /api/projects/:id - project page
pub async fn detail(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> ApiResult<ProjectDetail> {
    Ok(ApiResponse::success(state.projects.detail(&session, id).await?))
}

/// GET /api/projects/:id/edit - working copy for the edit form
pub async fn edit_form(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> ApiResult<EditSnapshot> {
    Ok(ApiResponse::success(state.projects.load_edit(&session, id).await?))
}

/// PUT /api/projects/:id/edit - save the edited working copy
///
/// Rows carrying an `id` are existing rows; rows without one are new. Stored
/// rows missing from the submission are deleted, except the caller's own
/// membership.
pub async fn save_edit(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
    payload: Result<Json<EditSubmission>, JsonRejection>,
) -> ApiResult<SaveReport> {
    let Json(submission) = payload?;
    Ok(ApiResponse::success(state.projects.save_edit(&session, id, submission).await?))
}

/// PATCH /api/projects/:id/phases/:phase_id - `{ "status": "in_progress" }`
pub async fn phase_status(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path((id, phase_id)): Path<(Uuid, Uuid)>,
    payload: Result<Json<PhaseStatusBody>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(body) = payload?;
    state
        .projects
        .update_phase_status(&session, id, phase_id, body.status)
        .await?;
    Ok(ApiResponse::success(json!({ "id": phase_id, "status": body.status })))
}

/// GET /api/projects/:id/documents
pub async fn documents(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<Document>> {
    Ok(ApiResponse::success(state.projects.documents(&session, id).await?))
}
