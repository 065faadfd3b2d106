//! Chat relay between reception and floors

use validator::Validate;

use super::notifications::{NotificationEvent, NotificationQueue};
use crate::{
    error::{AppError, AppResult},
    models::chat::{ChatMessage, CreateChatMessage},
    repository::Repository,
};

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

#[derive(Clone)]
pub struct ChatService {
    repository: Repository,
    notifications: NotificationQueue,
}

impl ChatService {
    pub fn new(repository: Repository, notifications: NotificationQueue) -> Self {
        Self {
            repository,
            notifications,
        }
    }

    pub async fn post(&self, mut message: CreateChatMessage) -> AppResult<ChatMessage> {
        message.sender = message.sender.trim().to_string();
        message.body = message.body.trim().to_string();
        message.validate()?;
        if message.body.is_empty() {
            return Err(AppError::Validation("Message is empty".to_string()));
        }

        let stored = self.repository.chat.append(&message).await?;
        tracing::debug!(message_id = stored.id, origin = %stored.origin, "Chat message posted");

        self.notifications
            .enqueue(NotificationEvent::ChatMessage(stored.clone()));
        Ok(stored)
    }

    /// Latest messages, oldest first
    pub async fn recent(&self, limit: Option<i64>) -> AppResult<Vec<ChatMessage>> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        self.repository.chat.recent(limit).await
    }

    pub async fn mark_read(&self, id: i64) -> AppResult<ChatMessage> {
        self.repository.chat.mark_read(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::ChatOrigin;

    fn service() -> ChatService {
        ChatService::new(Repository::in_memory(), NotificationQueue::disabled())
    }

    #[tokio::test]
    async fn test_post_trims_and_rejects_empty() {
        let chat = service();
        let posted = chat
            .post(CreateChatMessage {
                sender: " piso2 ".to_string(),
                origin: ChatOrigin::Floor(2),
                body: "  ¿Subió el señor Pérez?  ".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(posted.sender, "piso2");
        assert_eq!(posted.body, "¿Subió el señor Pérez?");
        assert!(!posted.read);

        let empty = chat
            .post(CreateChatMessage {
                sender: "piso2".to_string(),
                origin: ChatOrigin::Floor(2),
                body: "   ".to_string(),
            })
            .await;
        assert!(matches!(empty, Err(AppError::Validation(_))));
        assert_eq!(chat.recent(None).await.unwrap().len(), 1);
    }
}
