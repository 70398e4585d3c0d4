use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use super::{load_viewable, or_empty, profile_map, ServiceError};
use crate::authz;
use crate::database::models::{
    Document, Membership, MembershipWithProfile, Message, MessageWithAuthor, Phase, PhaseStatus, Profile,
    ProfileSummary, Project, ProjectForm, ProjectSummary,
};
use crate::database::{tables, DatabaseError, Gateway, Repository};
use crate::filter::FilterData;
use crate::reconcile::{
    apply_plan, reconcile, ApplyError, ApplyReport, ApplyScope, ApplyStep, MemberDraft, NewMember, PhaseDraft,
    PhaseList, Snapshot, WorkingItem,
};
use crate::session::Session;
use crate::validation::validate_project;

/// Membership role given to whoever creates a project.
pub const OWNER_ROLE: &str = "Admin";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateProject {
    pub project: ProjectForm,
    #[serde(default)]
    pub members: Vec<MemberDraft>,
    #[serde(default)]
    pub phases: Vec<PhaseDraft>,
}

/// Everything the edit form starts from. The caller's own membership is not
/// part of `members`.
#[derive(Debug, Clone, Serialize)]
pub struct EditSnapshot {
    pub project: Project,
    pub form: ProjectForm,
    pub members: Vec<WorkingItem<MemberDraft>>,
    pub phases: Vec<WorkingItem<PhaseDraft>>,
    pub users: Vec<ProfileSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditSubmission {
    pub project: ProjectForm,
    #[serde(default)]
    pub members: Vec<WorkingItem<MemberDraft>>,
    #[serde(default)]
    pub phases: Vec<WorkingItem<PhaseDraft>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    pub members: ApplyReport,
    pub phases: ApplyReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectDetail {
    pub project: Project,
    pub members: Vec<MembershipWithProfile>,
    pub phases: Vec<Phase>,
    pub messages: Vec<MessageWithAuthor>,
    pub documents: Vec<Document>,
    pub can_edit: bool,
}

#[derive(Serialize)]
struct NewProject<'a> {
    #[serde(flatten)]
    form: &'a ProjectForm,
    created_by: Uuid,
}

pub struct ProjectService {
    gateway: Arc<dyn Gateway>,
    projects: Repository<Project>,
    members: Repository<Membership>,
    phases: Repository<Phase>,
    messages: Repository<Message>,
    documents: Repository<Document>,
    profiles: Repository<Profile>,
}

/// Drop new member drafts for users who already sit on the team: the
/// editor, anyone whose stored row is kept in `working`, and repeats of an
/// earlier new draft.
fn without_seated(
    working: Vec<WorkingItem<MemberDraft>>,
    team: &[Membership],
    actor: Uuid,
) -> Vec<WorkingItem<MemberDraft>> {
    let kept: HashSet<Uuid> = working.iter().filter_map(|item| item.identity).collect();
    let mut seated: HashSet<Uuid> = team
        .iter()
        .filter(|m| kept.contains(&m.id))
        .map(|m| m.user_id)
        .collect();
    seated.insert(actor);

    working
        .into_iter()
        .filter(|item| match (item.identity, item.value.user_id) {
            (None, Some(user)) => seated.insert(user),
            _ => true,
        })
        .collect()
}

fn by_project(project_id: Uuid) -> FilterData {
    FilterData::matching(json!({ "project_id": project_id }))
}

impl ProjectService {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            projects: Repository::new(tables::PROJECTS, gateway.clone()),
            members: Repository::new(tables::PROJECT_MEMBERS, gateway.clone()),
            phases: Repository::new(tables::PROJECT_PHASES, gateway.clone()),
            messages: Repository::new(tables::MESSAGES, gateway.clone()),
            documents: Repository::new(tables::DOCUMENTS, gateway.clone()),
            profiles: Repository::new(tables::PROFILES, gateway.clone()),
            gateway,
        }
    }

    /// Newest first. Admins see every project, everyone else the projects
    /// they belong to. A failed load renders as an empty dashboard.
    pub async fn dashboard(&self, session: &Session) -> Vec<ProjectSummary> {
        match self.load_dashboard(session).await {
            Ok(projects) => projects,
            Err(err) => {
                error!(user_id = %session.user_id, error = %err, "failed to load dashboard");
                Vec::new()
            }
        }
    }

    async fn load_dashboard(&self, session: &Session) -> Result<Vec<ProjectSummary>, DatabaseError> {
        let projects = if authz::is_admin(session) {
            self.projects
                .select_any(FilterData::all().order_by("created_at desc"))
                .await?
        } else {
            let own = self
                .members
                .select_any(FilterData::matching(json!({ "user_id": session.user_id })))
                .await?;
            let ids: Vec<Uuid> = own.iter().map(|m| m.project_id).collect();
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            self.projects
                .select_any(FilterData::matching(json!({ "id": { "$in": ids } })).order_by("created_at desc"))
                .await?
        };

        let ids: Vec<Uuid> = projects.iter().map(|p| p.id).collect();
        let mut counts: HashMap<Uuid, usize> = HashMap::new();
        if !ids.is_empty() {
            let team = self
                .members
                .select_any(FilterData::matching(json!({ "project_id": { "$in": ids } })))
                .await?;
            for member in team {
                *counts.entry(member.project_id).or_default() += 1;
            }
        }

        Ok(projects
            .into_iter()
            .map(|project| ProjectSummary {
                member_count: counts.get(&project.id).copied().unwrap_or(0),
                project,
            })
            .collect())
    }

    /// Insert the project, then the creator's `Admin` membership with the
    /// complete new members, then the complete phases.
    pub async fn create(&self, session: &Session, request: CreateProject) -> Result<Project, ServiceError> {
        if !authz::can_create_project(session) {
            return Err(ServiceError::Forbidden("Only admins can create projects"));
        }
        validate_project(&request.project)?;

        let project = self
            .projects
            .insert_one(&NewProject { form: &request.project, created_by: session.user_id })
            .await
            .map_err(|source| ApplyError { collection: tables::PROJECTS, step: ApplyStep::Insert, source })?;

        let drafts = request.members.into_iter().map(WorkingItem::new).collect();
        let team = without_seated(drafts, &[], session.user_id);
        let mut member_plan = reconcile(&Snapshot::empty(), &team);
        member_plan.to_insert.insert(
            0,
            NewMember { user_id: session.user_id, role: OWNER_ROLE.to_string() },
        );
        apply_plan(self.gateway.as_ref(), &ApplyScope::members(project.id, session.user_id), member_plan).await?;

        let mut phases = PhaseList::new(request.phases.into_iter().map(WorkingItem::new).collect());
        phases.prune_incomplete();
        let phase_plan = reconcile(&Snapshot::empty(), phases.items());
        apply_plan(self.gateway.as_ref(), &ApplyScope::phases(project.id), phase_plan).await?;

        info!(project_id = %project.id, created_by = %session.user_id, "created project");
        Ok(project)
    }

    pub async fn load_edit(&self, session: &Session, project_id: Uuid) -> Result<EditSnapshot, ServiceError> {
        if !authz::can_edit_project(session) {
            return Err(ServiceError::Forbidden("Only admins can edit projects"));
        }

        let (project, team, phases, users) = tokio::join!(
            self.projects.select_one(FilterData::matching(json!({ "id": project_id }))),
            self.members.select_any(FilterData::matching(json!({
                "project_id": project_id,
                "user_id": { "$ne": session.user_id },
            }))),
            self.phases.select_any(by_project(project_id).order_by("order_num asc")),
            self.profiles_except(session),
        );
        let project = project?.ok_or(ServiceError::NotFound("Project"))?;

        let members = team?
            .iter()
            .map(|m| WorkingItem::existing(m.id, MemberDraft::from(m)))
            .collect();

        let mut phases = PhaseList::new(phases?.iter().map(WorkingItem::from).collect());
        if phases.is_empty() {
            phases.push_blank();
        }

        let users = users.unwrap_or_else(|err| {
            error!(error = %err, "failed to load profiles for edit form");
            Vec::new()
        });

        Ok(EditSnapshot {
            form: ProjectForm::from(&project),
            project,
            members,
            phases: phases.into_items(),
            users,
        })
    }

    /// Persist an edit: project fields, then the team plan, then the phase
    /// plan. The diff runs against the rows as currently stored. The first
    /// failing write aborts; earlier writes stay.
    pub async fn save_edit(
        &self,
        session: &Session,
        project_id: Uuid,
        submission: EditSubmission,
    ) -> Result<SaveReport, ServiceError> {
        if !authz::can_edit_project(session) {
            return Err(ServiceError::Forbidden("Only admins can edit projects"));
        }
        validate_project(&submission.project)?;

        let (project, team, stored_phases) = tokio::join!(
            self.projects.select_one(FilterData::matching(json!({ "id": project_id }))),
            self.members.select_any(by_project(project_id)),
            self.phases.select_any(by_project(project_id).order_by("order_num asc")),
        );
        project?.ok_or(ServiceError::NotFound("Project"))?;
        let team = team?;
        let stored_phases = stored_phases?;

        self.projects
            .update_where(&submission.project, FilterData::matching(json!({ "id": project_id })))
            .await
            .map_err(|source| ApplyError { collection: tables::PROJECTS, step: ApplyStep::Update, source })?;

        let loaded: Vec<WorkingItem<MemberDraft>> =
            team.iter().map(|m| WorkingItem::existing(m.id, MemberDraft::from(m))).collect();
        let snapshot = team
            .iter()
            .filter(|m| m.user_id == session.user_id)
            .fold(Snapshot::from_items(&loaded), |snapshot, own| snapshot.protect(own.id));
        let working = without_seated(submission.members, &team, session.user_id);
        let member_plan = reconcile(&snapshot, &working);
        let members =
            apply_plan(self.gateway.as_ref(), &ApplyScope::members(project_id, session.user_id), member_plan).await?;

        let loaded: Vec<WorkingItem<PhaseDraft>> = stored_phases.iter().map(WorkingItem::from).collect();
        let mut phases = PhaseList::new(submission.phases);
        phases.prune_incomplete();
        let phase_plan = reconcile(&Snapshot::from_items(&loaded), phases.items());
        let phases = apply_plan(self.gateway.as_ref(), &ApplyScope::phases(project_id), phase_plan).await?;

        info!(project_id = %project_id, "saved project edit");
        Ok(SaveReport { members, phases })
    }

    /// Project page. Project and team are loaded first to authorize; the
    /// remaining collections load concurrently and degrade to empty on failure.
    pub async fn detail(&self, session: &Session, project_id: Uuid) -> Result<ProjectDetail, ServiceError> {
        let (project, team) = load_viewable(&self.projects, &self.members, session, project_id).await?;

        let (phases, messages, documents) = tokio::join!(
            self.phases.select_any(by_project(project_id).order_by("order_num asc")),
            self.messages.select_any(by_project(project_id).order_by("created_at asc")),
            self.documents.select_any(by_project(project_id).order_by("created_at desc")),
        );
        let phases = or_empty(tables::PROJECT_PHASES, phases);
        let messages = or_empty(tables::MESSAGES, messages);
        let documents = or_empty(tables::DOCUMENTS, documents);

        let user_ids: Vec<Uuid> = team
            .iter()
            .map(|m| m.user_id)
            .chain(messages.iter().map(|m| m.user_id))
            .collect();
        let people = profile_map(&self.profiles, &user_ids).await;

        Ok(ProjectDetail {
            members: team
                .into_iter()
                .map(|membership| MembershipWithProfile {
                    profile: people.get(&membership.user_id).cloned(),
                    membership,
                })
                .collect(),
            messages: messages
                .into_iter()
                .map(|message| MessageWithAuthor {
                    author: people.get(&message.user_id).cloned(),
                    message,
                })
                .collect(),
            phases,
            documents,
            can_edit: authz::can_edit_project(session),
            project,
        })
    }

    pub async fn update_phase_status(
        &self,
        session: &Session,
        project_id: Uuid,
        phase_id: Uuid,
        status: PhaseStatus,
    ) -> Result<(), ServiceError> {
        if !authz::can_update_phase_status(session) {
            return Err(ServiceError::Forbidden("Only admins can change phase status"));
        }
        let touched = self
            .phases
            .update_where(
                &json!({ "status": status }),
                FilterData::matching(json!({ "id": phase_id, "project_id": project_id })),
            )
            .await
            .map_err(|source| ApplyError { collection: tables::PROJECT_PHASES, step: ApplyStep::Update, source })?;
        if touched == 0 {
            return Err(ServiceError::NotFound("Phase"));
        }
        Ok(())
    }

    pub async fn documents(&self, session: &Session, project_id: Uuid) -> Result<Vec<Document>, ServiceError> {
        load_viewable(&self.projects, &self.members, session, project_id).await?;
        Ok(self
            .documents
            .select_any(by_project(project_id).order_by("created_at desc"))
            .await?)
    }

    /// Every other account, for the team and client pickers.
    pub async fn profiles_except(&self, session: &Session) -> Result<Vec<ProfileSummary>, ServiceError> {
        if !authz::is_admin(session) {
            return Err(ServiceError::Forbidden("Only admins can list accounts"));
        }
        let profiles = self
            .profiles
            .select_any(FilterData::matching(json!({ "id": { "$ne": session.user_id } })).order_by("full_name asc"))
            .await?;
        Ok(profiles.iter().map(Profile::summary).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::UserRole;
    use crate::database::{GatewayOp, MemoryGateway, Row};
    use chrono::{NaiveDate, Utc};

    struct Fixture {
        gateway: Arc<MemoryGateway>,
        service: ProjectService,
        admin: Session,
    }

    fn session(role: UserRole) -> Session {
        let user_id = Uuid::new_v4();
        Session {
            session_id: Uuid::new_v4(),
            user_id,
            profile: Profile {
                id: user_id,
                email: format!("{}@example.com", user_id.simple()),
                full_name: "Test User".to_string(),
                role,
                avatar_url: None,
                created_at: Utc::now(),
            },
        }
    }

    fn fixture() -> Fixture {
        let gateway = Arc::new(MemoryGateway::new());
        Fixture {
            service: ProjectService::new(gateway.clone()),
            gateway,
            admin: session(UserRole::Admin),
        }
    }

    fn form(name: &str) -> ProjectForm {
        ProjectForm {
            name: name.to_string(),
            description: "Marketing site".to_string(),
            deadline: NaiveDate::from_ymd_opt(2030, 6, 1),
            progress: 10,
            ..Default::default()
        }
    }

    fn rows_for(rows: Vec<Row>, project: Uuid) -> Vec<Row> {
        rows.into_iter().filter(|r| r["project_id"] == json!(project)).collect()
    }

    #[tokio::test]
    async fn create_adds_owner_and_complete_rows_only() {
        let fx = fixture();
        let dev = Uuid::new_v4();
        let request = CreateProject {
            project: form("Site"),
            members: vec![
                MemberDraft { user_id: Some(dev), role: "dev".to_string() },
                MemberDraft { user_id: Some(Uuid::new_v4()), role: String::new() },
            ],
            phases: vec![PhaseDraft::blank(1), PhaseDraft::named("Build", 2)],
        };
        let project = fx.service.create(&fx.admin, request).await.unwrap();
        assert_eq!(project.created_by, fx.admin.user_id);

        let members = rows_for(fx.gateway.rows(tables::PROJECT_MEMBERS).await, project.id);
        assert_eq!(members.len(), 2);
        assert_eq!(members[0]["role"], json!(OWNER_ROLE));
        assert_eq!(members[0]["user_id"], json!(fx.admin.user_id));

        let phases = rows_for(fx.gateway.rows(tables::PROJECT_PHASES).await, project.id);
        assert_eq!(phases.len(), 1);
        assert_eq!(phases[0]["order_num"], json!(1));
    }

    #[tokio::test]
    async fn non_admin_cannot_create() {
        let fx = fixture();
        let request = CreateProject { project: form("Site"), ..Default::default() };
        let err = fx.service.create(&session(UserRole::Client), request).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        assert!(fx.gateway.rows(tables::PROJECTS).await.is_empty());
    }

    #[tokio::test]
    async fn edit_round_trip_is_idempotent() {
        let fx = fixture();
        let dev = Uuid::new_v4();
        let project = fx
            .service
            .create(
                &fx.admin,
                CreateProject {
                    project: form("Site"),
                    members: vec![MemberDraft { user_id: Some(dev), role: "dev".to_string() }],
                    phases: vec![PhaseDraft::named("Design", 1), PhaseDraft::named("Build", 2)],
                },
            )
            .await
            .unwrap();

        let snapshot = fx.service.load_edit(&fx.admin, project.id).await.unwrap();
        assert_eq!(snapshot.members.len(), 1, "the editor's own row is not editable");
        assert_eq!(snapshot.phases.len(), 2);

        let submission = EditSubmission {
            project: snapshot.form.clone(),
            members: snapshot.members.clone(),
            phases: snapshot.phases.clone(),
        };
        let report = fx.service.save_edit(&fx.admin, project.id, submission).await.unwrap();
        assert_eq!(report.members, ApplyReport::default());
        assert_eq!(report.phases, ApplyReport::default());
    }

    #[tokio::test]
    async fn removing_everyone_keeps_the_editor() {
        let fx = fixture();
        let project = fx
            .service
            .create(
                &fx.admin,
                CreateProject {
                    project: form("Site"),
                    members: vec![MemberDraft { user_id: Some(Uuid::new_v4()), role: "qa".to_string() }],
                    phases: vec![],
                },
            )
            .await
            .unwrap();

        let mut snapshot = fx.service.load_edit(&fx.admin, project.id).await.unwrap();
        // a project without phases offers one blank row to fill in
        assert_eq!(snapshot.phases.len(), 1);
        assert!(!snapshot.phases[0].is_existing());

        let submission = EditSubmission {
            project: snapshot.form.clone(),
            members: vec![],
            phases: std::mem::take(&mut snapshot.phases),
        };
        let report = fx.service.save_edit(&fx.admin, project.id, submission).await.unwrap();
        assert_eq!(report.members.deleted, 1);
        assert_eq!(report.phases.inserted, 0);

        let members = rows_for(fx.gateway.rows(tables::PROJECT_MEMBERS).await, project.id);
        assert_eq!(members.len(), 1);
        assert_eq!(members[0]["user_id"], json!(fx.admin.user_id));
    }

    #[tokio::test]
    async fn new_rows_for_seated_users_are_not_added() {
        let fx = fixture();
        let dev = Uuid::new_v4();
        let project = fx
            .service
            .create(
                &fx.admin,
                CreateProject {
                    project: form("Site"),
                    members: vec![
                        MemberDraft { user_id: Some(dev), role: "dev".to_string() },
                        MemberDraft { user_id: Some(dev), role: "qa".to_string() },
                        MemberDraft { user_id: Some(fx.admin.user_id), role: "viewer".to_string() },
                    ],
                    phases: vec![],
                },
            )
            .await
            .unwrap();
        assert_eq!(rows_for(fx.gateway.rows(tables::PROJECT_MEMBERS).await, project.id).len(), 2);

        let snapshot = fx.service.load_edit(&fx.admin, project.id).await.unwrap();
        let mut members = snapshot.members.clone();
        members.push(WorkingItem::new(MemberDraft { user_id: Some(fx.admin.user_id), role: "viewer".to_string() }));
        members.push(WorkingItem::new(MemberDraft { user_id: Some(dev), role: "lead".to_string() }));
        let submission = EditSubmission { project: snapshot.form.clone(), members, phases: snapshot.phases.clone() };
        let report = fx.service.save_edit(&fx.admin, project.id, submission).await.unwrap();
        assert_eq!(report.members, ApplyReport::default());

        let members = rows_for(fx.gateway.rows(tables::PROJECT_MEMBERS).await, project.id);
        let editor_rows: Vec<_> = members.iter().filter(|m| m["user_id"] == json!(fx.admin.user_id)).collect();
        assert_eq!(editor_rows.len(), 1);
        assert_eq!(editor_rows[0]["role"], json!(OWNER_ROLE));
        assert_eq!(members.iter().filter(|m| m["user_id"] == json!(dev)).count(), 1);
    }

    #[tokio::test]
    async fn replacing_a_member_row_re_adds_the_user() {
        let fx = fixture();
        let dev = Uuid::new_v4();
        let project = fx
            .service
            .create(
                &fx.admin,
                CreateProject {
                    project: form("Site"),
                    members: vec![MemberDraft { user_id: Some(dev), role: "dev".to_string() }],
                    phases: vec![],
                },
            )
            .await
            .unwrap();

        let snapshot = fx.service.load_edit(&fx.admin, project.id).await.unwrap();
        let submission = EditSubmission {
            project: snapshot.form.clone(),
            members: vec![WorkingItem::new(MemberDraft { user_id: Some(dev), role: "lead".to_string() })],
            phases: vec![],
        };
        let report = fx.service.save_edit(&fx.admin, project.id, submission).await.unwrap();
        assert_eq!(report.members, ApplyReport { deleted: 1, updated: 0, inserted: 1 });

        let members = rows_for(fx.gateway.rows(tables::PROJECT_MEMBERS).await, project.id);
        let dev_rows: Vec<_> = members.iter().filter(|m| m["user_id"] == json!(dev)).collect();
        assert_eq!(dev_rows.len(), 1);
        assert_eq!(dev_rows[0]["role"], json!("lead"));
    }

    #[tokio::test]
    async fn failed_phase_write_surfaces_after_member_writes() {
        let fx = fixture();
        let project = fx
            .service
            .create(&fx.admin, CreateProject { project: form("Site"), ..Default::default() })
            .await
            .unwrap();
        fx.gateway.fail_on(tables::PROJECT_PHASES, GatewayOp::Insert).await;

        let submission = EditSubmission {
            project: form("Renamed"),
            members: vec![WorkingItem::new(MemberDraft { user_id: Some(Uuid::new_v4()), role: "dev".to_string() })],
            phases: vec![WorkingItem::new(PhaseDraft::named("Launch", 1))],
        };
        let err = fx.service.save_edit(&fx.admin, project.id, submission).await.unwrap_err();
        assert!(matches!(err, ServiceError::Apply(ApplyError { step: ApplyStep::Insert, .. })));

        // no rollback: the rename and the new member are already stored
        let stored = fx.gateway.rows(tables::PROJECTS).await;
        assert_eq!(stored[0]["name"], json!("Renamed"));
        assert_eq!(rows_for(fx.gateway.rows(tables::PROJECT_MEMBERS).await, project.id).len(), 2);
    }

    #[tokio::test]
    async fn dashboard_scopes_by_membership_and_degrades() {
        let fx = fixture();
        let freelancer = session(UserRole::Freelancer);
        fx.service
            .create(
                &fx.admin,
                CreateProject {
                    project: form("Shared"),
                    members: vec![MemberDraft { user_id: Some(freelancer.user_id), role: "dev".to_string() }],
                    phases: vec![],
                },
            )
            .await
            .unwrap();
        fx.service
            .create(&fx.admin, CreateProject { project: form("Private"), ..Default::default() })
            .await
            .unwrap();

        let all = fx.service.dashboard(&fx.admin).await;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].project.name, "Private", "newest first");

        let mine = fx.service.dashboard(&freelancer).await;
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].project.name, "Shared");
        assert_eq!(mine[0].member_count, 2);

        fx.gateway.fail_on(tables::PROJECTS, GatewayOp::Select).await;
        assert!(fx.service.dashboard(&fx.admin).await.is_empty());
    }

    #[tokio::test]
    async fn detail_substitutes_empty_collections() {
        let fx = fixture();
        let project = fx
            .service
            .create(
                &fx.admin,
                CreateProject { project: form("Site"), phases: vec![PhaseDraft::named("Build", 1)], ..Default::default() },
            )
            .await
            .unwrap();
        fx.gateway.fail_on(tables::MESSAGES, GatewayOp::Select).await;

        let detail = fx.service.detail(&fx.admin, project.id).await.unwrap();
        assert_eq!(detail.phases.len(), 1);
        assert!(detail.messages.is_empty());
        assert!(detail.can_edit);

        let outsider = session(UserRole::Client);
        assert!(matches!(
            fx.service.detail(&outsider, project.id).await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn phase_status_update_is_scoped_to_project() {
        let fx = fixture();
        let project = fx
            .service
            .create(
                &fx.admin,
                CreateProject { project: form("Site"), phases: vec![PhaseDraft::named("Build", 1)], ..Default::default() },
            )
            .await
            .unwrap();
        let phase_id: Uuid = serde_json::from_value(fx.gateway.rows(tables::PROJECT_PHASES).await[0]["id"].clone()).unwrap();

        fx.service
            .update_phase_status(&fx.admin, project.id, phase_id, PhaseStatus::Completed)
            .await
            .unwrap();
        assert_eq!(fx.gateway.rows(tables::PROJECT_PHASES).await[0]["status"], json!("completed"));

        let err = fx
            .service
            .update_phase_status(&fx.admin, Uuid::new_v4(), phase_id, PhaseStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("Phase")));
    }
}
