use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use super::{or_empty, ServiceError};
use crate::database::models::{ContactForm, ContactSubmission, ShowcaseProject};
use crate::database::{tables, Gateway, Repository};
use crate::filter::FilterData;
use crate::validation::validate_contact;

/// Public portfolio pages: the showcase grid and the contact form.
#[derive(Clone)]
pub struct PortfolioService {
    showcase: Repository<ShowcaseProject>,
    contacts: Repository<ContactSubmission>,
}

impl PortfolioService {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            showcase: Repository::new(tables::SHOWCASE_PROJECTS, gateway.clone()),
            contacts: Repository::new(tables::CONTACT_SUBMISSIONS, gateway),
        }
    }

    /// Active showcase entries by `display_order`; an empty grid on failure.
    pub async fn showcase(&self) -> Vec<ShowcaseProject> {
        let result = self
            .showcase
            .select_any(FilterData::matching(json!({ "is_active": true })).order_by("display_order asc"))
            .await;
        or_empty(tables::SHOWCASE_PROJECTS, result)
    }

    /// Store a contact request. The notification email is sent by the
    /// contact mailer once the insert is observed.
    pub async fn submit_contact(&self, form: ContactForm) -> Result<ContactSubmission, ServiceError> {
        validate_contact(&form)?;
        let project_type = form
            .project_type
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let submission = self
            .contacts
            .insert_one(&json!({
                "name": form.name.trim(),
                "email": form.email.trim(),
                "project_type": project_type,
                "message": form.message.trim(),
            }))
            .await
            .map_err(|err| {
                error!(error = %err, "failed to store contact submission");
                err
            })?;
        info!(email = %submission.email, "contact submission received");
        Ok(submission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{GatewayOp, MemoryGateway, Row};
    use uuid::Uuid;

    fn showcase_row(title: &str, order: i32, active: bool) -> Row {
        json!({
            "id": Uuid::new_v4(),
            "title": title,
            "description": "work",
            "tags": ["rust"],
            "display_order": order,
            "is_active": active,
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[tokio::test]
    async fn showcase_lists_active_in_display_order() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway
            .seed(
                tables::SHOWCASE_PROJECTS,
                vec![
                    showcase_row("third", 3, true),
                    showcase_row("hidden", 0, false),
                    showcase_row("first", 1, true),
                ],
            )
            .await;
        let portfolio = PortfolioService::new(gateway.clone());

        let titles: Vec<String> = portfolio.showcase().await.into_iter().map(|p| p.title).collect();
        assert_eq!(titles, vec!["first", "third"]);

        gateway.fail_on(tables::SHOWCASE_PROJECTS, GatewayOp::Select).await;
        assert!(portfolio.showcase().await.is_empty());
    }

    #[tokio::test]
    async fn contact_is_validated_then_stored() {
        let gateway = Arc::new(MemoryGateway::new());
        let portfolio = PortfolioService::new(gateway.clone());

        let invalid = ContactForm { name: "Ada".into(), email: "ada".into(), ..Default::default() };
        assert!(matches!(portfolio.submit_contact(invalid).await, Err(ServiceError::Validation(_))));
        assert!(gateway.rows(tables::CONTACT_SUBMISSIONS).await.is_empty());

        let form = ContactForm {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            project_type: Some("".into()),
            message: "Need a site".into(),
        };
        let stored = portfolio.submit_contact(form).await.unwrap();
        assert!(stored.id.is_some());
        assert_eq!(stored.project_type, None);
    }
}
