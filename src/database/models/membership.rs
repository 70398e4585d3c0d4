use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::profile::ProfileSummary;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Membership {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MembershipWithProfile {
    #[serde(flatten)]
    pub membership: Membership,
    pub profile: Option<ProfileSummary>,
}
