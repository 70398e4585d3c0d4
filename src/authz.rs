//! Authorization predicates, checked by services before any gateway call.

use crate::database::models::{Membership, Project, UserRole};
use crate::session::Session;

pub fn is_admin(session: &Session) -> bool {
    session.role() == UserRole::Admin
}

pub fn is_member(session: &Session, members: &[Membership]) -> bool {
    members.iter().any(|m| m.user_id == session.user_id)
}

/// Admins see everything; others see projects they created, are the client
/// of, or are a member of.
pub fn can_view_project(session: &Session, project: &Project, members: &[Membership]) -> bool {
    is_admin(session)
        || project.created_by == session.user_id
        || project.client_id == Some(session.user_id)
        || is_member(session, members)
}

pub fn can_create_project(session: &Session) -> bool {
    is_admin(session)
}

pub fn can_edit_project(session: &Session) -> bool {
    is_admin(session)
}

pub fn can_update_phase_status(session: &Session) -> bool {
    is_admin(session)
}

pub fn can_post_message(session: &Session, project: &Project, members: &[Membership]) -> bool {
    can_view_project(session, project, members)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{Profile, ProjectStatus};
    use chrono::Utc;
    use uuid::Uuid;

    fn session(role: UserRole) -> Session {
        let user_id = Uuid::new_v4();
        Session {
            session_id: Uuid::new_v4(),
            user_id,
            profile: Profile {
                id: user_id,
                email: "someone@example.com".to_string(),
                full_name: "Someone".to_string(),
                role,
                avatar_url: None,
                created_at: Utc::now(),
            },
        }
    }

    fn project(created_by: Uuid, client_id: Option<Uuid>) -> Project {
        Project {
            id: Uuid::new_v4(),
            name: "Site".to_string(),
            description: "Rebuild".to_string(),
            status: ProjectStatus::Planning,
            deadline: None,
            client_id,
            progress: 0,
            created_by,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn visibility() {
        let admin = session(UserRole::Admin);
        let client = session(UserRole::Client);
        let freelancer = session(UserRole::Freelancer);
        let p = project(admin.user_id, Some(client.user_id));

        assert!(can_view_project(&admin, &p, &[]));
        assert!(can_view_project(&client, &p, &[]));
        assert!(!can_view_project(&freelancer, &p, &[]));

        let members = vec![Membership {
            id: Uuid::new_v4(),
            project_id: p.id,
            user_id: freelancer.user_id,
            role: "dev".to_string(),
        }];
        assert!(can_view_project(&freelancer, &p, &members));
        assert!(can_post_message(&freelancer, &p, &members));
    }

    #[test]
    fn management_is_admin_only() {
        assert!(can_edit_project(&session(UserRole::Admin)));
        assert!(!can_edit_project(&session(UserRole::Freelancer)));
        assert!(!can_create_project(&session(UserRole::Client)));
        assert!(!can_update_phase_status(&session(UserRole::Client)));
    }
}
