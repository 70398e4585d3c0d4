use async_trait::async_trait;
use chrono::{Duration, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{AuthError, IdentityProvider, Session, SignInRequest, SignUpRequest, SignedIn};
use crate::auth::{generate_jwt, hash_password_blocking, validate_jwt, verify_password_blocking, Claims};
use crate::config::{OAuthConfig, SecurityConfig};
use crate::database::models::{AuthSession, Credential, Profile, UserRole};
use crate::database::{tables, Gateway, Repository};
use crate::filter::FilterData;

#[derive(Serialize)]
struct NewProfile<'a> {
    id: Uuid,
    email: &'a str,
    full_name: &'a str,
    role: UserRole,
}

#[derive(Serialize)]
struct NewSession {
    id: Uuid,
    user_id: Uuid,
    expires_at: String,
}

/// Identity provider backed by the gateway: `profiles`, `credentials` and
/// `sessions` rows plus HS256 tokens.
pub struct LocalIdentityProvider {
    profiles: Repository<Profile>,
    credentials: Repository<Credential>,
    sessions: Repository<AuthSession>,
    jwt_secret: String,
    expiry_hours: u64,
    password_cost: u32,
    oauth: OAuthConfig,
}

impl LocalIdentityProvider {
    pub fn new(gateway: Arc<dyn Gateway>, security: &SecurityConfig, oauth: &OAuthConfig) -> Self {
        Self {
            profiles: Repository::new(tables::PROFILES, gateway.clone()),
            credentials: Repository::new(tables::CREDENTIALS, gateway.clone()),
            sessions: Repository::new(tables::SESSIONS, gateway),
            jwt_secret: security.jwt_secret.clone(),
            expiry_hours: security.jwt_expiry_hours,
            password_cost: security.password_hash_cost,
            oauth: oauth.clone(),
        }
    }

    async fn open_session(&self, profile: Profile) -> Result<SignedIn, AuthError> {
        let expires_at = Utc::now() + Duration::hours(self.expiry_hours as i64);
        let row = self
            .sessions
            .insert_one(&NewSession {
                id: Uuid::new_v4(),
                user_id: profile.id,
                expires_at: expires_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            })
            .await?;

        let token = generate_jwt(&Claims::new(profile.id, row.id, self.expiry_hours), &self.jwt_secret)?;
        Ok(SignedIn {
            token,
            expires_in: self.expiry_hours as i64 * 3600,
            session: Session {
                session_id: row.id,
                user_id: profile.id,
                profile,
            },
        })
    }

    async fn profile(&self, user_id: Uuid) -> Result<Profile, AuthError> {
        self.profiles
            .select_one(FilterData::matching(json!({ "id": user_id })))
            .await?
            .ok_or(AuthError::MissingProfile)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignedIn, AuthError> {
        let email = normalize_email(&request.email);
        let existing = self
            .credentials
            .select_one(FilterData::matching(json!({ "email": email })))
            .await?;
        if existing.is_some() {
            return Err(AuthError::AlreadyRegistered);
        }

        let password_hash = hash_password_blocking(request.password.clone(), self.password_cost).await?;

        let user_id = Uuid::new_v4();
        let profile = self
            .profiles
            .insert_one(&NewProfile {
                id: user_id,
                email: &email,
                full_name: request.full_name.trim(),
                role: request.role,
            })
            .await?;

        let credential = Credential { user_id, email: email.clone(), password_hash };
        if let Err(err) = self.credentials.insert_one(&credential).await {
            // every profile row must have a credential row
            if let Err(cleanup) = self
                .profiles
                .delete_where(FilterData::matching(json!({ "id": user_id })))
                .await
            {
                error!(user_id = %user_id, error = %cleanup, "failed to remove profile after credential insert failed");
            }
            return Err(err.into());
        }

        info!(user_id = %user_id, role = ?profile.role, "registered account");
        self.open_session(profile).await
    }

    async fn sign_in(&self, request: &SignInRequest) -> Result<SignedIn, AuthError> {
        let email = normalize_email(&request.email);
        let credential = self
            .credentials
            .select_one(FilterData::matching(json!({ "email": email })))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password_blocking(request.password.clone(), credential.password_hash.clone()).await? {
            warn!(user_id = %credential.user_id, "rejected sign in");
            return Err(AuthError::InvalidCredentials);
        }

        let profile = self.profile(credential.user_id).await?;
        self.open_session(profile).await
    }

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        self.sessions
            .delete_where(FilterData::matching(json!({ "id": session.session_id })))
            .await?;
        info!(user_id = %session.user_id, "signed out");
        Ok(())
    }

    async fn authenticate(&self, token: &str) -> Result<Session, AuthError> {
        let claims = validate_jwt(token, &self.jwt_secret)?;
        let row = self
            .sessions
            .select_one(FilterData::matching(json!({ "id": claims.sid, "user_id": claims.sub })))
            .await?
            .ok_or(AuthError::SessionEnded)?;
        if row.expires_at <= Utc::now() {
            return Err(AuthError::SessionEnded);
        }

        Ok(Session {
            session_id: row.id,
            user_id: row.user_id,
            profile: self.profile(row.user_id).await?,
        })
    }

    async fn refresh(&self, token: &str) -> Result<SignedIn, AuthError> {
        let current = self.authenticate(token).await?;
        self.sign_out(&current).await?;
        self.open_session(current.profile).await
    }

    fn oauth_authorize_url(&self, provider: &str) -> Result<String, AuthError> {
        if provider != "google" {
            return Err(AuthError::UnsupportedProvider(provider.to_string()));
        }
        let client_id = self.oauth.client_id.as_deref().ok_or(AuthError::OAuthNotConfigured)?;
        let url = url::Url::parse_with_params(
            &self.oauth.authorize_url,
            &[
                ("client_id", client_id),
                ("redirect_uri", self.oauth.redirect_url.as_str()),
                ("response_type", "code"),
                ("scope", "openid email profile"),
            ],
        )
        .map_err(|_| AuthError::OAuthNotConfigured)?;
        Ok(url.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::{GatewayOp, MemoryGateway};

    fn provider() -> LocalIdentityProvider {
        let config = AppConfig::from_env();
        let mut security = config.security.clone();
        security.jwt_secret = "test-secret".to_string();
        LocalIdentityProvider::new(Arc::new(MemoryGateway::new()), &security, &config.oauth)
    }

    fn sign_up_request(email: &str) -> SignUpRequest {
        SignUpRequest {
            email: email.to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
            full_name: "Ada Lovelace".to_string(),
            role: UserRole::Freelancer,
        }
    }

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let idp = provider();
        let signed_up = idp.sign_up(&sign_up_request("Ada@Example.com")).await.unwrap();
        assert_eq!(signed_up.session.profile.email, "ada@example.com");
        assert_eq!(signed_up.session.role(), UserRole::Freelancer);

        let signed_in = idp
            .sign_in(&SignInRequest { email: "ada@example.com".to_string(), password: "secret1".to_string() })
            .await
            .unwrap();
        let session = idp.authenticate(&signed_in.token).await.unwrap();
        assert_eq!(session.user_id, signed_up.session.user_id);
    }

    #[tokio::test]
    async fn duplicate_email_and_wrong_password() {
        let idp = provider();
        idp.sign_up(&sign_up_request("ada@example.com")).await.unwrap();

        let err = idp.sign_up(&sign_up_request("ada@example.com")).await.unwrap_err();
        assert_eq!(err.to_string(), "User already registered");

        let err = idp
            .sign_in(&SignInRequest { email: "ada@example.com".to_string(), password: "nope".to_string() })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid login credentials");
    }

    #[tokio::test]
    async fn failed_credential_insert_leaves_no_profile() {
        let gateway = Arc::new(MemoryGateway::new());
        let config = AppConfig::from_env();
        let mut security = config.security.clone();
        security.jwt_secret = "test-secret".to_string();
        let idp = LocalIdentityProvider::new(gateway.clone(), &security, &config.oauth);

        gateway.fail_on(tables::CREDENTIALS, GatewayOp::Insert).await;
        assert!(matches!(
            idp.sign_up(&sign_up_request("ada@example.com")).await,
            Err(AuthError::Database(_))
        ));
        assert!(gateway.rows(tables::PROFILES).await.is_empty());

        gateway.clear_failures().await;
        let signed = idp.sign_up(&sign_up_request("ada@example.com")).await.unwrap();
        assert_eq!(gateway.rows(tables::PROFILES).await.len(), 1);

        let stored = gateway.rows(tables::CREDENTIALS).await;
        let hash = stored[0]["password_hash"].as_str().unwrap_or_default();
        assert!(hash.starts_with("$2"), "expected a bcrypt hash, got {}", hash);
        assert!(!hash.contains("secret1"));
        assert_eq!(stored[0]["user_id"], serde_json::json!(signed.session.user_id));
    }

    #[tokio::test]
    async fn sign_out_invalidates_token() {
        let idp = provider();
        let signed = idp.sign_up(&sign_up_request("ada@example.com")).await.unwrap();
        idp.sign_out(&signed.session).await.unwrap();
        assert!(matches!(idp.authenticate(&signed.token).await, Err(AuthError::SessionEnded)));
    }

    #[tokio::test]
    async fn refresh_rotates_session() {
        let idp = provider();
        let signed = idp.sign_up(&sign_up_request("ada@example.com")).await.unwrap();
        let refreshed = idp.refresh(&signed.token).await.unwrap();
        assert_ne!(refreshed.session.session_id, signed.session.session_id);
        assert!(idp.authenticate(&signed.token).await.is_err());
        assert!(idp.authenticate(&refreshed.token).await.is_ok());
    }

    #[test]
    fn oauth_url_requires_known_configured_provider() {
        let mut idp = provider();
        assert!(matches!(idp.oauth_authorize_url("github"), Err(AuthError::UnsupportedProvider(_))));
        idp.oauth.client_id = None;
        assert!(matches!(idp.oauth_authorize_url("google"), Err(AuthError::OAuthNotConfigured)));
        idp.oauth.client_id = Some("client-123".to_string());
        let url = idp.oauth_authorize_url("google").unwrap();
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("response_type=code"));
    }
}
