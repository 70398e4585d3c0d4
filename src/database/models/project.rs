use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Planning,
    InProgress,
    Review,
    Completed,
    OnHold,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub client_id: Option<Uuid>,
    #[serde(default)]
    pub progress: i32,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Dashboard card: a project plus how many members it has.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProjectSummary {
    #[serde(flatten)]
    pub project: Project,
    pub member_count: usize,
}

/// Editable project fields as submitted by the create and edit forms.
/// Unselected date and client pickers arrive as `""`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProjectForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default, deserialize_with = "super::serde_util::empty_string_as_none")]
    pub deadline: Option<NaiveDate>,
    #[serde(default, deserialize_with = "super::serde_util::empty_string_as_none")]
    pub client_id: Option<Uuid>,
    #[serde(default)]
    pub progress: i32,
}

impl From<&Project> for ProjectForm {
    fn from(project: &Project) -> Self {
        Self {
            name: project.name.clone(),
            description: project.description.clone(),
            status: project.status,
            deadline: project.deadline,
            client_id: project.client_id,
            progress: project.progress,
        }
    }
}
