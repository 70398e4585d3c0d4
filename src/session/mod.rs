//! Session and identity provider.
//!
//! A [`Session`] is an explicit, read-only handle resolved once per request
//! from the bearer token and handed to every service call that needs the
//! acting user. Signing out deletes the server-side session row, after which
//! the token no longer authenticates.

pub mod local;

pub use local::LocalIdentityProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::{JwtError, PasswordError};
use crate::database::models::{Profile, UserRole};
use crate::database::DatabaseError;

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub profile: Profile,
}

impl Session {
    pub fn role(&self) -> UserRole {
        self.profile.role
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SignedIn {
    pub token: String,
    pub expires_in: i64,
    pub session: Session,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignUpRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, alias = "confirmPassword")]
    pub confirm_password: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub role: UserRole,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignInRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("User already registered")]
    AlreadyRegistered,

    #[error("Session expired or signed out")]
    SessionEnded,

    #[error("Profile not found for this account")]
    MissingProfile,

    #[error("Unsupported OAuth provider: {0}")]
    UnsupportedProvider(String),

    #[error("OAuth sign-in is not configured")]
    OAuthNotConfigured,

    #[error(transparent)]
    Jwt(#[from] JwtError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register an account and sign it in.
    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignedIn, AuthError>;

    async fn sign_in(&self, request: &SignInRequest) -> Result<SignedIn, AuthError>;

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError>;

    /// Resolve a bearer token to the live session it names.
    async fn authenticate(&self, token: &str) -> Result<Session, AuthError>;

    /// Replace the session behind `token` with a fresh one.
    async fn refresh(&self, token: &str) -> Result<SignedIn, AuthError>;

    /// Where to send the browser for third-party sign-in.
    fn oauth_authorize_url(&self, provider: &str) -> Result<String, AuthError>;
}
