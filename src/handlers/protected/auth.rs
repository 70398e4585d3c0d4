// handlers/protected/auth.rs - session introspection, refresh and sign out

use axum::{extract::State, Extension};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, BearerToken};
use crate::session::{Session, SignedIn};

/// GET /api/auth/whoami - the signed-in account and its profile
pub async fn whoami(Extension(session): Extension<Session>) -> ApiResult<Session> {
    Ok(ApiResponse::success(session))
}

/// PUT /api/auth/session/refresh - rotate the session; the old token stops working
pub async fn refresh(State(state): State<AppState>, Extension(BearerToken(token)): Extension<BearerToken>) -> ApiResult<SignedIn> {
    Ok(ApiResponse::success(state.identity.refresh(&token).await?))
}

/// DELETE /api/auth/session - sign out
pub async fn logout(State(state): State<AppState>, Extension(session): Extension<Session>) -> ApiResult<Value> {
    state.identity.sign_out(&session).await?;
    Ok(ApiResponse::success(json!({ "signed_out": true })))
}
