use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Reconcilable;
use crate::database::models::serde_util::empty_string_as_none;
use crate::database::models::Membership;

/// Editable team row. An unselected user arrives as `""` and becomes `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberDraft {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewMember {
    pub user_id: Uuid,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberUpdate {
    pub role: String,
}

impl Reconcilable for MemberDraft {
    type Id = Uuid;
    type Insert = NewMember;
    type Update = MemberUpdate;

    fn insert_payload(&self) -> Option<NewMember> {
        let user_id = self.user_id?;
        if self.role.is_empty() {
            return None;
        }
        Some(NewMember { user_id, role: self.role.clone() })
    }

    fn update_payload(&self) -> MemberUpdate {
        MemberUpdate { role: self.role.clone() }
    }
}

impl From<&Membership> for MemberDraft {
    fn from(row: &Membership) -> Self {
        Self {
            user_id: Some(row.user_id),
            role: row.role.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unselected_user_deserializes_as_none() {
        let draft: MemberDraft = serde_json::from_value(json!({ "user_id": "", "role": "dev" })).unwrap();
        assert_eq!(draft.user_id, None);
        assert!(!draft.is_complete());
    }

    #[test]
    fn whitespace_role_counts_as_present() {
        let draft = MemberDraft { user_id: Some(Uuid::new_v4()), role: " ".to_string() };
        assert!(draft.is_complete());
    }
}
