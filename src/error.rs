// HTTP API Error Types
use axum::{extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::JwtError;
use crate::database::DatabaseError;
use crate::filter::FilterError;
use crate::reconcile::ApplyError;
use crate::services::{EmailError, ServiceError};
use crate::session::AuthError;
use crate::validation::ValidationErrors;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 502 Bad Gateway (external service issues)
    BadGateway(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::InternalServerError(_) => 500,
            ApiError::BadGateway(_) => 502,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::BadGateway(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::ValidationError { message, field_errors } => {
                let mut response = json!({
                    "error": true,
                    "message": message,
                    "code": "VALIDATION_ERROR"
                });

                if let Some(field_errors) = field_errors {
                    response["field_errors"] = json!(field_errors);
                }

                response
            }
            _ => {
                json!({
                    "error": true,
                    "message": self.message(),
                    "code": self.error_code()
                })
            }
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::BadGateway(_) => "BAD_GATEWAY",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>, field_errors: Option<HashMap<String, String>>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        ApiError::BadGateway(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::ConfigMissing(_) | DatabaseError::InvalidDatabaseUrl => {
                tracing::error!("Database configuration error: {}", err);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::Filter(filter_err) => filter_err.into(),
            DatabaseError::QueryError(msg) => {
                // Don't expose internal SQL errors to clients
                tracing::error!("Database query error: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            DatabaseError::Serialization(json_err) => {
                tracing::error!("Row serialization error: {}", json_err);
                ApiError::internal_server_error("Failed to read stored data")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        let field_errors: HashMap<String, String> =
            err.fields().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        ApiError::validation_error(err.summary(), Some(field_errors))
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::AlreadyRegistered => ApiError::conflict(err.to_string()),
            AuthError::InvalidCredentials | AuthError::SessionEnded => ApiError::unauthorized(err.to_string()),
            AuthError::Jwt(JwtError::InvalidToken(_)) => ApiError::unauthorized("Invalid or expired token"),
            AuthError::Jwt(jwt_err) => {
                tracing::error!("Token signing error: {}", jwt_err);
                ApiError::internal_server_error("Could not issue a session token")
            }
            AuthError::Password(hash_err) => {
                tracing::error!("Password hashing error: {}", hash_err);
                ApiError::internal_server_error("Could not check the password")
            }
            AuthError::MissingProfile => ApiError::unauthorized(err.to_string()),
            AuthError::UnsupportedProvider(_) => ApiError::bad_request(err.to_string()),
            AuthError::OAuthNotConfigured => ApiError::service_unavailable(err.to_string()),
            AuthError::Database(db_err) => db_err.into(),
        }
    }
}

/// Submit failures surface the store's message so the form can show it.
impl From<ApplyError> for ApiError {
    fn from(err: ApplyError) -> Self {
        tracing::error!(collection = err.collection, step = %err.step, "{}", err);
        ApiError::internal_server_error(err.to_string())
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            ServiceError::NotFound(_) => ApiError::not_found(err.to_string()),
            ServiceError::Validation(errors) => errors.into(),
            ServiceError::Apply(apply_err) => apply_err.into(),
            ServiceError::Database(db_err) => db_err.into(),
        }
    }
}

impl From<EmailError> for ApiError {
    fn from(err: EmailError) -> Self {
        tracing::error!("Email delivery error: {}", err);
        ApiError::bad_gateway("Email could not be sent")
    }
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        ApiError::invalid_json(err.body_text())
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::ApplyStep;

    #[test]
    fn validation_errors_carry_field_messages() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "Project name is required");
        let api: ApiError = errors.into();
        let body = api.to_json();
        assert_eq!(api.status_code(), 400);
        assert_eq!(body["message"], "Project name is required");
        assert_eq!(body["field_errors"]["name"], "Project name is required");
    }

    #[test]
    fn auth_errors_map_to_status() {
        assert_eq!(ApiError::from(AuthError::AlreadyRegistered).status_code(), 409);
        let api = ApiError::from(AuthError::InvalidCredentials);
        assert_eq!(api.status_code(), 401);
        assert_eq!(api.message(), "Invalid login credentials");
    }

    #[test]
    fn apply_errors_name_the_failed_step() {
        let api = ApiError::from(ServiceError::Apply(ApplyError {
            collection: "project_members",
            step: ApplyStep::Delete,
            source: DatabaseError::QueryError("connection reset".to_string()),
        }));
        assert_eq!(api.status_code(), 500);
        assert_eq!(api.message(), "Failed to delete project_members: Query error: connection reset");
    }

    #[test]
    fn internal_query_errors_are_hidden() {
        let api = ApiError::from(DatabaseError::QueryError("syntax error at or near".to_string()));
        assert_eq!(api.message(), "An error occurred while processing your request");
    }
}
