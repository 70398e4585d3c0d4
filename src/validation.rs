//! Form validation. Runs before any gateway or identity call.

use std::collections::BTreeMap;
use std::fmt;

use crate::database::models::{ContactForm, ProjectForm, UserRole};
use crate::session::{SignInRequest, SignUpRequest};

/// Per-field messages; the first one doubles as the summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` for `field` unless the field already has one.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields.entry(field.to_string()).or_insert_with(|| message.into());
    }

    pub fn require(&mut self, field: &str, label: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, format!("{} is required", label));
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn summary(&self) -> &str {
        self.fields.values().next().map(String::as_str).unwrap_or("Validation failed")
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.summary())
    }
}

impl std::error::Error for ValidationErrors {}

pub fn validate_sign_up(request: &SignUpRequest, min_password_length: usize) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.require("full_name", "Full name", &request.full_name);
    errors.require("email", "Email", &request.email);
    if request.password != request.confirm_password {
        errors.add("confirm_password", "Passwords do not match");
    }
    if request.password.chars().count() < min_password_length {
        errors.add(
            "password",
            format!("Password must be at least {} characters", min_password_length),
        );
    }
    if request.role == UserRole::Admin {
        errors.add("role", "Choose client or freelancer");
    }
    errors.into_result()
}

pub fn validate_sign_in(request: &SignInRequest) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.require("email", "Email", &request.email);
    if request.password.is_empty() {
        errors.add("password", "Password is required");
    }
    errors.into_result()
}

pub fn validate_project(form: &ProjectForm) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.require("name", "Project name", &form.name);
    errors.require("description", "Description", &form.description);
    if form.deadline.is_none() {
        errors.add("deadline", "Deadline is required");
    }
    if !(0..=100).contains(&form.progress) {
        errors.add("progress", "Progress must be between 0 and 100");
    }
    errors.into_result()
}

pub fn validate_contact(form: &ContactForm) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.require("name", "Name", &form.name);
    errors.require("email", "Email", &form.email);
    if !form.email.trim().is_empty() && !form.email.contains('@') {
        errors.add("email", "Enter a valid email address");
    }
    errors.require("message", "Message", &form.message);
    errors.into_result()
}

pub fn validate_chat_message(text: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.require("message", "Message", text);
    errors.into_result()
}
