// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition, the portfolio pages and the contact email webhook.
pub mod auth;
pub mod functions;
pub mod portfolio;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::app::AppState;

/// GET / - service description
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "folio-desk",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Portfolio site backend with a client/freelancer project dashboard",
            "endpoints": {
                "health": "/health (public)",
                "auth": "/auth/signup, /auth/login, /auth/oauth/:provider (public)",
                "portfolio": "/api/portfolio/projects, /api/contact (public)",
                "session": "/api/auth/whoami, /api/auth/session[/refresh] (protected)",
                "projects": "/api/projects[/:id[/edit|/phases/:phase_id|/documents|/messages[/stream]]] (protected)",
                "profiles": "/api/profiles (protected, admin)",
            }
        }
    }))
}

/// GET /health - store reachability
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.gateway.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok",
                    "subscribers": state.notifier.subscriber_count(),
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
