pub mod contact;
pub mod document;
pub mod membership;
pub mod message;
pub mod phase;
pub mod profile;
pub mod project;
pub mod session;
pub mod showcase;

pub use contact::{ContactForm, ContactSubmission};
pub use document::Document;
pub use membership::{Membership, MembershipWithProfile};
pub use message::{Message, MessageWithAuthor};
pub use phase::{Phase, PhaseStatus};
pub use profile::{Profile, ProfileSummary, UserRole};
pub use project::{Project, ProjectForm, ProjectStatus, ProjectSummary};
pub use session::{AuthSession, Credential};
pub use showcase::ShowcaseProject;

/// Serde helpers for form input where an unselected value arrives as `""`.
pub mod serde_util {
    use serde::{Deserialize, Deserializer};
    use std::str::FromStr;

    pub fn empty_string_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => s.parse::<T>().map(Some).map_err(serde::de::Error::custom),
        }
    }
}
