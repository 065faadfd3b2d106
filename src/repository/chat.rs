//! Chat repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::ChatStore;
use crate::{
    error::{AppError, AppResult},
    models::chat::{ChatMessage, ChatMessageRow, CreateChatMessage},
};

#[derive(Clone)]
pub struct ChatRepository {
    pool: Pool<Postgres>,
}

impl ChatRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatStore for ChatRepository {
    async fn append(&self, message: &CreateChatMessage) -> AppResult<ChatMessage> {
        sqlx::query_as::<_, ChatMessageRow>(
            r#"
            INSERT INTO chat_messages (sender, origin, body, created_at, read)
            VALUES ($1, $2, $3, NOW(), FALSE)
            RETURNING *
            "#,
        )
        .bind(&message.sender)
        .bind(message.origin.to_string())
        .bind(&message.body)
        .fetch_one(&self.pool)
        .await?
        .try_into()
    }

    async fn recent(&self, limit: i64) -> AppResult<Vec<ChatMessage>> {
        let mut rows = sqlx::query_as::<_, ChatMessageRow>(
            "SELECT * FROM chat_messages ORDER BY created_at DESC, id DESC LIMIT $1",
        )
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;

        rows.reverse();
        rows.into_iter().map(ChatMessage::try_from).collect()
    }

    async fn mark_read(&self, id: i64) -> AppResult<ChatMessage> {
        sqlx::query_as::<_, ChatMessageRow>(
            "UPDATE chat_messages SET read = TRUE WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Chat message with id {} not found", id)))?
        .try_into()
    }
}
