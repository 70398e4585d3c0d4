// handlers/public/functions.rs - POST /functions/send-contact-email
//
// Database webhook target: `{ "record": <contact_submissions row> }`.
// The caller must send the configured secret in `x-webhook-secret`. Once
// accepted it always answers `{ "success": true }`; delivery problems are only logged.

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::ContactSubmission;
use crate::error::ApiError;

pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    record: ContactSubmission,
}

pub async fn send_contact_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let Some(expected) = state.webhook_secret.as_deref() else {
        return Err(ApiError::service_unavailable("Contact webhook is not configured"));
    };
    let presented = headers
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if !secrets_match(presented, expected) {
        tracing::warn!("rejected contact email webhook call");
        return Err(ApiError::unauthorized("Invalid webhook secret"));
    }

    match serde_json::from_slice::<WebhookPayload>(&body) {
        Ok(payload) => {
            if let Err(err) = state.mailer.deliver(&payload.record).await {
                tracing::error!(error = %err, "contact email webhook delivery failed");
            }
        }
        Err(err) => tracing::warn!(error = %err, "unreadable contact email webhook payload"),
    }
    Ok(Json(json!({ "success": true })))
}

/// Compare without stopping at the first differing byte.
fn secrets_match(presented: &str, expected: &str) -> bool {
    let (a, b) = (presented.as_bytes(), expected.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_comparison() {
        assert!(secrets_match("hook-secret", "hook-secret"));
        assert!(!secrets_match("hook-secreT", "hook-secret"));
        assert!(!secrets_match("hook", "hook-secret"));
        assert!(!secrets_match("", "hook-secret"));
    }
}
