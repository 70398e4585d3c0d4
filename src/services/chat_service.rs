use serde_json::json;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::{load_viewable, profile_map, ServiceError};
use crate::authz;
use crate::database::models::{Membership, Message, MessageWithAuthor, Profile, Project};
use crate::database::{tables, DatabaseError, Gateway, Repository};
use crate::filter::FilterData;
use crate::realtime::{ChangeKind, ChangeNotifier};
use crate::session::Session;
use crate::validation::validate_chat_message;

/// Project chat: the message thread plus a live feed fed by the change notifier.
#[derive(Clone)]
pub struct ChatService {
    projects: Repository<Project>,
    members: Repository<Membership>,
    messages: Repository<Message>,
    profiles: Repository<Profile>,
    notifier: ChangeNotifier,
}

impl ChatService {
    pub fn new(gateway: Arc<dyn Gateway>, notifier: ChangeNotifier) -> Self {
        Self {
            projects: Repository::new(tables::PROJECTS, gateway.clone()),
            members: Repository::new(tables::PROJECT_MEMBERS, gateway.clone()),
            messages: Repository::new(tables::MESSAGES, gateway.clone()),
            profiles: Repository::new(tables::PROFILES, gateway),
            notifier,
        }
    }

    /// The whole thread, oldest first.
    pub async fn messages(&self, session: &Session, project_id: Uuid) -> Result<Vec<MessageWithAuthor>, ServiceError> {
        load_viewable(&self.projects, &self.members, session, project_id).await?;
        Ok(self.thread(project_id).await?)
    }

    pub async fn send(&self, session: &Session, project_id: Uuid, text: &str) -> Result<Message, ServiceError> {
        validate_chat_message(text)?;
        let (project, team) = load_viewable(&self.projects, &self.members, session, project_id).await?;
        if !authz::can_post_message(session, &project, &team) {
            return Err(ServiceError::Forbidden("You are not a member of this project"));
        }

        let message = self
            .messages
            .insert_one(&json!({
                "project_id": project_id,
                "user_id": session.user_id,
                "message": text.trim(),
            }))
            .await
            .map_err(|err| {
                error!(project_id = %project_id, error = %err, "failed to send message");
                err
            })?;
        debug!(project_id = %project_id, message_id = %message.id, "message sent");
        Ok(message)
    }

    /// Open a live view of the thread after checking the caller may read it.
    pub async fn open_feed(&self, session: &Session, project_id: Uuid) -> Result<ChatFeed, ServiceError> {
        load_viewable(&self.projects, &self.members, session, project_id).await?;
        Ok(ChatFeed::open(self.clone(), project_id).await)
    }

    async fn thread(&self, project_id: Uuid) -> Result<Vec<MessageWithAuthor>, DatabaseError> {
        let messages = self
            .messages
            .select_any(FilterData::matching(json!({ "project_id": project_id })).order_by("created_at asc"))
            .await?;
        let authors: Vec<Uuid> = messages.iter().map(|m| m.user_id).collect();
        let people = profile_map(&self.profiles, &authors).await;
        Ok(messages
            .into_iter()
            .map(|message| MessageWithAuthor {
                author: people.get(&message.user_id).cloned(),
                message,
            })
            .collect())
    }
}

/// Live message list for one project.
///
/// Every `messages` insert for the project triggers a full reload into a
/// `watch` channel. Dropping the feed stops the task and releases the
/// subscription.
pub struct ChatFeed {
    receiver: watch::Receiver<Vec<MessageWithAuthor>>,
    task: JoinHandle<()>,
}

impl ChatFeed {
    pub async fn open(chat: ChatService, project_id: Uuid) -> Self {
        // subscribe before the first load so no insert falls in between
        let mut subscription = chat.notifier.subscribe(
            tables::MESSAGES,
            ChangeKind::Insert,
            Some(("project_id".to_string(), json!(project_id))),
        );

        let initial = chat.thread(project_id).await.unwrap_or_else(|err| {
            error!(project_id = %project_id, error = %err, "failed to load messages");
            Vec::new()
        });
        let (sender, receiver) = watch::channel(initial);

        let task = tokio::spawn(async move {
            while subscription.recv().await.is_some() {
                match chat.thread(project_id).await {
                    Ok(messages) => {
                        if sender.send(messages).is_err() {
                            break;
                        }
                    }
                    Err(err) => error!(project_id = %project_id, error = %err, "failed to reload messages"),
                }
            }
            subscription.unsubscribe();
        });

        info!(project_id = %project_id, "chat feed opened");
        Self { receiver, task }
    }

    pub fn current(&self) -> Vec<MessageWithAuthor> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next reload; `None` once the feed has stopped.
    pub async fn changed(&mut self) -> Option<Vec<MessageWithAuthor>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }
}

impl Drop for ChatFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}
