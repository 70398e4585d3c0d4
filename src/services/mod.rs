pub mod chat_service;
pub mod contact_email;
pub mod portfolio_service;
pub mod project_service;

pub use chat_service::{ChatFeed, ChatService};
pub use contact_email::{format_contact_email, ContactEmail, ContactMailer, EmailError, EmailSender, LogSender, ResendSender};
pub use portfolio_service::PortfolioService;
pub use project_service::{CreateProject, EditSnapshot, EditSubmission, ProjectDetail, ProjectService, SaveReport};

use serde_json::json;
use std::collections::HashMap;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use crate::authz;
use crate::database::models::{Membership, Profile, ProfileSummary, Project};
use crate::database::{DatabaseError, Repository};
use crate::filter::FilterData;
use crate::reconcile::ApplyError;
use crate::session::Session;
use crate::validation::ValidationErrors;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Apply(#[from] ApplyError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Substitute an empty collection for a failed load, logging the cause.
pub(crate) fn or_empty<T>(collection: &str, result: Result<Vec<T>, DatabaseError>) -> Vec<T> {
    result.unwrap_or_else(|err| {
        error!(collection, error = %err, "failed to load collection");
        Vec::new()
    })
}

/// Load a project and its members, then check the caller may view it.
pub(crate) async fn load_viewable(
    projects: &Repository<Project>,
    members: &Repository<Membership>,
    session: &Session,
    project_id: Uuid,
) -> Result<(Project, Vec<Membership>), ServiceError> {
    let (project, team) = tokio::join!(
        projects.select_one(FilterData::matching(json!({ "id": project_id }))),
        members.select_any(FilterData::matching(json!({ "project_id": project_id }))),
    );
    let project = project?.ok_or(ServiceError::NotFound("Project"))?;
    let team = or_empty("project_members", team);

    if !authz::can_view_project(session, &project, &team) {
        return Err(ServiceError::Forbidden("You are not a member of this project"));
    }
    Ok((project, team))
}

/// Profile summaries keyed by user id. A failed load yields an empty map so
/// callers render without names.
pub(crate) async fn profile_map(
    profiles: &Repository<Profile>,
    user_ids: &[Uuid],
) -> HashMap<Uuid, ProfileSummary> {
    let mut unique = user_ids.to_vec();
    unique.sort();
    unique.dedup();
    or_empty("profiles", profiles.select_ids(&unique).await)
        .into_iter()
        .map(|profile| (profile.id, profile.summary()))
        .collect()
}
