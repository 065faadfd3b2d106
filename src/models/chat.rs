//! Reception/floor chat messages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::AppError;

/// Where a chat message was typed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ChatOrigin {
    Reception,
    Floor(u8),
}

impl std::fmt::Display for ChatOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatOrigin::Reception => write!(f, "reception"),
            ChatOrigin::Floor(n) => write!(f, "floor_{}", n),
        }
    }
}

impl std::str::FromStr for ChatOrigin {
    type Err = String;

    /// `reception`, `floor_2`, `floor2`; legacy `recepcion` / `piso_2` also accepted
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        if lower == "reception" || lower == "recepcion" {
            return Ok(ChatOrigin::Reception);
        }
        lower
            .strip_prefix("floor")
            .or_else(|| lower.strip_prefix("piso"))
            .map(|rest| rest.trim_start_matches('_'))
            .and_then(|n| n.parse::<u8>().ok())
            .map(ChatOrigin::Floor)
            .ok_or_else(|| format!("Invalid chat origin: {}", s))
    }
}

impl TryFrom<String> for ChatOrigin {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ChatOrigin> for String {
    fn from(origin: ChatOrigin) -> Self {
        origin.to_string()
    }
}

/// Internal row structure for database queries
#[derive(Debug, Clone, FromRow)]
pub struct ChatMessageRow {
    id: i64,
    sender: String,
    origin: String,
    body: String,
    created_at: DateTime<Utc>,
    read: bool,
}

impl TryFrom<ChatMessageRow> for ChatMessage {
    type Error = AppError;

    fn try_from(row: ChatMessageRow) -> Result<Self, Self::Error> {
        let origin = row
            .origin
            .parse()
            .map_err(|e: String| AppError::Internal(format!("Chat message {}: {}", row.id, e)))?;
        Ok(ChatMessage {
            id: row.id,
            sender: row.sender,
            origin,
            body: row.body,
            created_at: row.created_at,
            read: row.read,
        })
    }
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChatMessage {
    pub id: i64,
    /// Staff username
    pub sender: String,
    /// `reception` or `floor_<n>`
    #[schema(value_type = String)]
    pub origin: ChatOrigin,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

/// Post message request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateChatMessage {
    #[validate(length(min = 1, max = 100, message = "Sender must be 1 to 100 characters"))]
    pub sender: String,
    #[schema(value_type = String)]
    pub origin: ChatOrigin,
    #[validate(length(max = 2000, message = "Message is too long"))]
    pub body: String,
}

/// Query parameters for the message log
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ChatQuery {
    /// Number of most recent messages (default 50)
    pub limit: Option<i64>,
}
