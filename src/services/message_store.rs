// Message store: append-only prompt/response rows per user.
// PostgreSQL in production; an in-memory store backs the service tests.

use crate::chat::ChatScope;
use crate::models::chat::{NewMessage, PromptRow, StoredMessage};
use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Message store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Appends one message and returns it with its id and timestamp.
    async fn insert(&self, message: NewMessage) -> Result<StoredMessage, StoreError>;

    /// Every message of a user, oldest first.
    async fn list_for_user(&self, user_id: i32) -> Result<Vec<StoredMessage>, StoreError>;

    /// Messages of one chat, oldest first.
    async fn list_in_scope(&self, user_id: i32, scope: &ChatScope) -> Result<Vec<StoredMessage>, StoreError>;

    /// Removes the messages of one chat and returns how many went.
    async fn delete_in_scope(&self, user_id: i32, scope: &ChatScope) -> Result<u64, StoreError>;
}

pub struct PgMessageStore {
    db_pool: PgPool,
}

impl PgMessageStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

fn decode_rows(rows: Vec<PromptRow>) -> Vec<StoredMessage> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id;
            match StoredMessage::try_from(row) {
                Ok(message) => Some(message),
                Err(role) => {
                    tracing::warn!("Skipping prompt {} with unknown role '{}'", id, role);
                    None
                }
            }
        })
        .collect()
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn insert(&self, message: NewMessage) -> Result<StoredMessage, StoreError> {
        let row = sqlx::query_as::<_, PromptRow>(
            "INSERT INTO prompts (user_id, chat_id, role, content, created_at)
             VALUES ($1, $2, $3, $4, NOW())
             RETURNING id, user_id, chat_id, role, content, created_at"
        )
        .bind(message.user_id)
        .bind(&message.chat_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .fetch_one(&self.db_pool)
        .await?;

        tracing::debug!(
            "Saved {} message {} for user {} (chat: {:?})",
            message.role.as_str(), row.id, message.user_id, message.chat_id
        );

        Ok(StoredMessage {
            id: row.id,
            user_id: row.user_id,
            chat_id: row.chat_id,
            role: message.role,
            content: row.content,
            created_at: row.created_at,
        })
    }

    async fn list_for_user(&self, user_id: i32) -> Result<Vec<StoredMessage>, StoreError> {
        let rows = sqlx::query_as::<_, PromptRow>(
            "SELECT id, user_id, chat_id, role, content, created_at
             FROM prompts
             WHERE user_id = $1
             ORDER BY created_at ASC, id ASC"
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(decode_rows(rows))
    }

    async fn list_in_scope(&self, user_id: i32, scope: &ChatScope) -> Result<Vec<StoredMessage>, StoreError> {
        let rows = match scope {
            ChatScope::Exact(chat_id) => {
                sqlx::query_as::<_, PromptRow>(
                    "SELECT id, user_id, chat_id, role, content, created_at
                     FROM prompts
                     WHERE user_id = $1 AND chat_id = $2
                     ORDER BY created_at ASC, id ASC"
                )
                .bind(user_id)
                .bind(chat_id)
                .fetch_all(&self.db_pool)
                .await?
            }
            ChatScope::TimeRange { start, end } => {
                sqlx::query_as::<_, PromptRow>(
                    "SELECT id, user_id, chat_id, role, content, created_at
                     FROM prompts
                     WHERE user_id = $1 AND created_at >= $2 AND created_at < $3
                     ORDER BY created_at ASC, id ASC"
                )
                .bind(user_id)
                .bind(start)
                .bind(end)
                .fetch_all(&self.db_pool)
                .await?
            }
        };

        Ok(decode_rows(rows))
    }

    async fn delete_in_scope(&self, user_id: i32, scope: &ChatScope) -> Result<u64, StoreError> {
        let result = match scope {
            ChatScope::Exact(chat_id) => {
                sqlx::query("DELETE FROM prompts WHERE user_id = $1 AND chat_id = $2")
                    .bind(user_id)
                    .bind(chat_id)
                    .execute(&self.db_pool)
                    .await?
            }
            ChatScope::TimeRange { start, end } => {
                sqlx::query("DELETE FROM prompts WHERE user_id = $1 AND created_at >= $2 AND created_at < $3")
                    .bind(user_id)
                    .bind(start)
                    .bind(end)
                    .execute(&self.db_pool)
                    .await?
            }
        };

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
pub use memory::InMemoryMessageStore;
