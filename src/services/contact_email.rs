//! Contact notification email.
//!
//! Every stored contact submission is mailed to the site owner. The
//! [`ContactMailer`] listens for `contact_submissions` inserts on the change
//! notifier; the `send-contact-email` webhook reuses the same delivery path
//! for submissions announced from outside the process.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::EmailConfig;
use crate::database::models::ContactSubmission;
use crate::database::{from_row, tables};
use crate::realtime::{ChangeKind, ChangeNotifier};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Email provider rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

pub fn format_contact_email(record: &ContactSubmission, config: &EmailConfig) -> ContactEmail {
    let project_type = record
        .project_type
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or("Not specified");

    let html = format!(
        "<h2>New Contact Form Submission</h2>\n\
         <p><strong>Name:</strong> {}</p>\n\
         <p><strong>Email:</strong> {}</p>\n\
         <p><strong>Project Type:</strong> {}</p>\n\
         <p><strong>Message:</strong></p>\n\
         <p>{}</p>\n\
         <p><strong>Submitted:</strong> {}</p>\n",
        escape_html(&record.name),
        escape_html(&record.email),
        escape_html(project_type),
        escape_html(&record.message),
        record.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
    );

    ContactEmail {
        from: config.from.clone(),
        to: vec![config.to.clone()],
        subject: format!("New Contact Form Submission from {}", record.name),
        html,
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: &ContactEmail) -> Result<(), EmailError>;
}

/// Delivers through the Resend HTTP API.
pub struct ResendSender {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl ResendSender {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl EmailSender for ResendSender {
    async fn send(&self, email: &ContactEmail) -> Result<(), EmailError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(email)
            .timeout(Duration::from_secs(10))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Rejected { status: status.as_u16(), body });
        }
        Ok(())
    }
}

/// Writes the email to the log instead of sending it. Used when no API key is configured.
pub struct LogSender;

#[async_trait]
impl EmailSender for LogSender {
    async fn send(&self, email: &ContactEmail) -> Result<(), EmailError> {
        info!(to = ?email.to, subject = %email.subject, "contact email (not sent, no API key configured)");
        Ok(())
    }
}

pub fn sender_from_config(config: &EmailConfig) -> Arc<dyn EmailSender> {
    match &config.resend_api_key {
        Some(key) => Arc::new(ResendSender::new(config.api_url.clone(), key.clone())),
        None => {
            warn!("RESEND_API_KEY not set, contact emails will only be logged");
            Arc::new(LogSender)
        }
    }
}

#[derive(Clone)]
pub struct ContactMailer {
    sender: Arc<dyn EmailSender>,
    config: EmailConfig,
}

impl ContactMailer {
    pub fn new(sender: Arc<dyn EmailSender>, config: EmailConfig) -> Self {
        Self { sender, config }
    }

    /// Format and send the notification for one submission.
    pub async fn deliver(&self, record: &ContactSubmission) -> Result<(), EmailError> {
        let email = format_contact_email(record, &self.config);
        self.sender.send(&email).await?;
        info!(from = %record.email, "contact notification sent");
        Ok(())
    }

    /// Mail every `contact_submissions` insert until the notifier closes.
    /// Delivery failures are logged and never reach the submitter.
    pub fn spawn(self, notifier: &ChangeNotifier) -> JoinHandle<()> {
        let mut subscription = notifier.subscribe(tables::CONTACT_SUBMISSIONS, ChangeKind::Insert, None);
        tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                let record: ContactSubmission = match from_row(event.record.clone()) {
                    Ok(record) => record,
                    Err(err) => {
                        error!(error = %err, "unreadable contact submission event");
                        continue;
                    }
                };
                if let Err(err) = self.deliver(&record).await {
                    error!(error = %err, "failed to send contact notification");
                }
            }
        })
    }
}
