#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

use folio_desk::app::{app, AppState};
use folio_desk::config::AppConfig;
use folio_desk::database::{tables, Gateway, MemoryGateway, NotifyingGateway};
use folio_desk::filter::FilterData;
use folio_desk::realtime::ChangeNotifier;
use folio_desk::services::{ContactEmail, EmailError, EmailSender};

pub const WEBHOOK_SECRET: &str = "integration-webhook-secret";

/// Captures outgoing email instead of sending it.
#[derive(Default)]
pub struct Outbox {
    pub sent: Mutex<Vec<ContactEmail>>,
}

#[async_trait]
impl EmailSender for Outbox {
    async fn send(&self, email: &ContactEmail) -> Result<(), EmailError> {
        self.sent.lock().await.push(email.clone());
        Ok(())
    }
}

/// The full router over an in-memory store, driven in-process.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<NotifyingGateway<MemoryGateway>>,
    pub state: AppState,
    pub notifier: ChangeNotifier,
    pub outbox: Arc<Outbox>,
}

pub struct Account {
    pub token: String,
    pub user_id: Uuid,
}

impl TestApp {
    pub fn new() -> Self {
        let mut config = AppConfig::from_env();
        config.security.jwt_secret = "integration-test-secret".to_string();
        config.email.webhook_secret = Some(WEBHOOK_SECRET.to_string());

        let notifier = ChangeNotifier::new(64);
        let store = Arc::new(NotifyingGateway::new(MemoryGateway::new(), notifier.clone()));
        let outbox = Arc::new(Outbox::default());
        let state = AppState::new(store.clone(), notifier.clone(), &config, outbox.clone());
        let router = app(state.clone(), &config);

        Self { router, store, state, notifier, outbox }
    }

    pub fn memory(&self) -> &MemoryGateway {
        self.store.inner()
    }

    pub async fn request(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let bearer = token.map(|token| format!("Bearer {}", token));
        let headers: Vec<(&str, &str)> = bearer.iter().map(|b| (header::AUTHORIZATION.as_str(), b.as_str())).collect();
        self.request_with_headers(method, path, &headers, body).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        path: &str,
        headers: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
        Ok((status, value))
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.request(Method::GET, path, token, None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::POST, path, token, Some(body)).await
    }

    pub async fn put(&self, path: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::PUT, path, token, Some(body)).await
    }

    pub async fn patch(&self, path: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::PATCH, path, token, Some(body)).await
    }

    pub async fn sign_up(&self, email: &str, full_name: &str, role: &str) -> Result<Account> {
        let (status, body) = self
            .post(
                "/auth/signup",
                None,
                json!({
                    "email": email,
                    "password": "secret1",
                    "confirmPassword": "secret1",
                    "full_name": full_name,
                    "role": role,
                }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "sign up failed: {} {}", status, body);
        Ok(Account {
            token: body["data"]["token"].as_str().unwrap_or_default().to_string(),
            user_id: serde_json::from_value(body["data"]["session"]["user_id"].clone())?,
        })
    }

    /// Accounts cannot register as admin; promote one directly in the store.
    pub async fn admin(&self, email: &str) -> Result<Account> {
        let account = self.sign_up(email, "Site Admin", "client").await?;
        self.store
            .update(
                tables::PROFILES,
                json!({ "role": "admin" }).as_object().cloned().unwrap_or_default(),
                FilterData::matching(json!({ "id": account.user_id })),
            )
            .await?;
        Ok(account)
    }

    pub async fn rows(&self, table: &str) -> Vec<serde_json::Map<String, Value>> {
        self.memory().rows(table).await
    }
}
