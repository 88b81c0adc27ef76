// src/models/chat.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Who authored a message row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn from_db(role: &str) -> Option<Self> {
        match role {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// Raw `prompts` row as read by sqlx.
#[derive(Debug, Clone, FromRow)]
pub struct PromptRow {
    pub id: i64,
    pub user_id: i32,
    pub chat_id: Option<String>,
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A persisted message with its role decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMessage {
    pub id: i64,
    pub user_id: i32,
    pub chat_id: Option<String>,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PromptRow> for StoredMessage {
    type Error = String;

    fn try_from(row: PromptRow) -> Result<Self, Self::Error> {
        let role = Role::from_db(&row.role).ok_or(row.role)?;
        Ok(StoredMessage {
            id: row.id,
            user_id: row.user_id,
            chat_id: row.chat_id,
            role,
            content: row.content,
            created_at: row.created_at,
        })
    }
}

/// A message about to be appended to the store.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub user_id: i32,
    pub chat_id: Option<String>,
    pub role: Role,
    pub content: String,
}

impl NewMessage {
    pub fn user(user_id: i32, chat_id: Option<String>, content: String) -> Self {
        Self { user_id, chat_id, role: Role::User, content }
    }

    pub fn assistant(user_id: i32, chat_id: Option<String>, content: String) -> Self {
        Self { user_id, chat_id, role: Role::Assistant, content }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    pub id: String,
    pub title: String,
    pub message_count: usize,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatDetail {
    pub id: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    pub message_count: usize,
}

#[derive(Debug, Serialize)]
pub struct ChatListResponse {
    pub success: bool,
    pub chats: Vec<ChatSummary>,
}

#[derive(Debug, Serialize)]
pub struct ChatDetailResponse {
    pub success: bool,
    pub chat: ChatDetail,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTitleRequest {
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTitleResponse {
    pub success: bool,
    pub message: String,
    pub chat_id: String,
    pub title: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteChatResponse {
    pub success: bool,
    pub message: String,
    pub deleted_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptRequest {
    pub content: Option<String>,
    pub chat_id: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PromptResponse {
    pub reply: String,
    pub chat_id: String,
}
