// handlers/public/auth.rs - POST /auth/signup, POST /auth/login, GET /auth/oauth/:provider

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Redirect,
    Json,
};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::session::{SignInRequest, SignUpRequest, SignedIn};
use crate::validation::{validate_sign_in, validate_sign_up};

/// POST /auth/signup - register a client or freelancer account and sign it in
///
/// Fields are validated before the identity provider is called; an
/// existing email answers 409 with `User already registered`.
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> ApiResult<SignedIn> {
    let Json(request) = payload?;
    validate_sign_up(&request, state.min_password_length)?;
    let signed_in = state.identity.sign_up(&request).await?;
    Ok(ApiResponse::created(signed_in))
}

/// POST /auth/login - exchange email and password for a session token
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> ApiResult<SignedIn> {
    let Json(request) = payload?;
    validate_sign_in(&request)?;
    Ok(ApiResponse::success(state.identity.sign_in(&request).await?))
}

/// GET /auth/oauth/:provider - redirect to the provider's consent page
pub async fn oauth_redirect(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> Result<Redirect, ApiError> {
    let url = state.identity.oauth_authorize_url(&provider)?;
    Ok(Redirect::temporary(&url))
}
