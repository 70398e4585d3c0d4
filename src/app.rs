// app.rs - shared state and router assembly
//
// Public routes need no token. Protected routes run behind the session
// middleware, which resolves the bearer token into a `Session` extension.

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{AppConfig, SecurityConfig};
use crate::database::Gateway;
use crate::handlers::{protected, public};
use crate::middleware::session_middleware;
use crate::realtime::ChangeNotifier;
use crate::services::{ChatService, ContactMailer, EmailSender, PortfolioService, ProjectService};
use crate::session::{IdentityProvider, LocalIdentityProvider};

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn Gateway>,
    pub notifier: ChangeNotifier,
    pub identity: Arc<dyn IdentityProvider>,
    pub projects: Arc<ProjectService>,
    pub chat: ChatService,
    pub portfolio: PortfolioService,
    pub mailer: ContactMailer,
    pub min_password_length: usize,
    pub webhook_secret: Option<String>,
}

impl AppState {
    /// Wire every service over `gateway`. Inserts are expected to reach
    /// `notifier`, normally by wrapping the store in a `NotifyingGateway`.
    pub fn new(
        gateway: Arc<dyn Gateway>,
        notifier: ChangeNotifier,
        config: &AppConfig,
        email_sender: Arc<dyn EmailSender>,
    ) -> Self {
        Self {
            identity: Arc::new(LocalIdentityProvider::new(gateway.clone(), &config.security, &config.oauth)),
            projects: Arc::new(ProjectService::new(gateway.clone())),
            chat: ChatService::new(gateway.clone(), notifier.clone()),
            portfolio: PortfolioService::new(gateway.clone()),
            mailer: ContactMailer::new(email_sender, config.email.clone()),
            min_password_length: config.security.min_password_length,
            webhook_secret: config.email.webhook_secret.clone(),
            gateway,
            notifier,
        }
    }
}

pub fn app(state: AppState, config: &AppConfig) -> Router {
    let router = Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
        .layer(cors_layer(&config.security));

    let router = if config.api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };
    router.with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .route("/auth/signup", post(public::auth::signup))
        .route("/auth/login", post(public::auth::login))
        .route("/auth/oauth/:provider", get(public::auth::oauth_redirect))
        .route("/api/portfolio/projects", get(public::portfolio::showcase))
        .route("/api/contact", post(public::portfolio::contact))
        .route("/functions/send-contact-email", post(public::functions::send_contact_email))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::{auth, messages, profiles, projects};

    Router::new()
        .route("/api/auth/whoami", get(auth::whoami))
        .route("/api/auth/session/refresh", put(auth::refresh))
        .route("/api/auth/session", axum::routing::delete(auth::logout))
        .route("/api/profiles", get(profiles::list))
        .route("/api/projects", get(projects::dashboard).post(projects::create))
        .route("/api/projects/:id", get(projects::detail))
        .route("/api/projects/:id/edit", get(projects::edit_form).put(projects::save_edit))
        .route("/api/projects/:id/phases/:phase_id", patch(projects::phase_status))
        .route("/api/projects/:id/documents", get(projects::documents))
        .route("/api/projects/:id/messages", get(messages::list).post(messages::send))
        .route("/api/projects/:id/messages/stream", get(messages::stream))
        .route_layer(middleware::from_fn_with_state(state, session_middleware))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }
    if security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers(Any)
}
