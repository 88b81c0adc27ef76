// src/chat/aggregate.rs
//! Folds a user's flat message log into chats.

use super::strategy::ChatIdStrategy;
use crate::models::chat::{ChatDetail, ChatMessage, ChatSummary, Role, StoredMessage};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

pub const TITLE_MAX_CHARS: usize = 40;
const TITLE_ELLIPSIS: &str = "...";

#[derive(Debug, Clone, PartialEq)]
pub struct ChatEntry {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A chat rebuilt from stored messages. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Chat {
    pub id: String,
    pub title: String,
    pub messages: Vec<ChatEntry>,
    pub last_updated: DateTime<Utc>,
    pub message_count: usize,
}

impl Chat {
    pub fn summary(&self) -> ChatSummary {
        ChatSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            message_count: self.message_count,
            last_updated: self.last_updated,
        }
    }

    pub fn into_detail(self) -> ChatDetail {
        ChatDetail {
            id: self.id,
            title: self.title,
            message_count: self.message_count,
            messages: self
                .messages
                .into_iter()
                .map(|entry| ChatMessage { role: entry.role, content: entry.content })
                .collect(),
        }
    }
}

struct ChatAccumulator {
    id: String,
    title: Option<String>,
    messages: Vec<ChatEntry>,
    first_seen: DateTime<Utc>,
    last_updated: DateTime<Utc>,
}

impl ChatAccumulator {
    fn new(id: String, first_seen: DateTime<Utc>) -> Self {
        Self { id, title: None, messages: Vec::new(), first_seen, last_updated: first_seen }
    }

    fn push(&mut self, message: &StoredMessage) {
        if self.title.is_none() && message.role == Role::User {
            self.title = Some(chat_title(&message.content));
        }
        self.messages.push(ChatEntry {
            role: message.role,
            content: message.content.clone(),
            created_at: message.created_at,
        });
        if message.created_at > self.last_updated {
            self.last_updated = message.created_at;
        }
    }

    fn finish(self, strategy: &ChatIdStrategy) -> Chat {
        let title = self
            .title
            .unwrap_or_else(|| strategy.placeholder_title(self.first_seen));
        Chat {
            id: self.id,
            title,
            message_count: self.messages.len(),
            messages: self.messages,
            last_updated: self.last_updated,
        }
    }
}

/// First user message, cut to 40 characters with a trailing ellipsis.
pub fn chat_title(content: &str) -> String {
    match content.char_indices().nth(TITLE_MAX_CHARS) {
        Some((cut, _)) => format!("{}{}", &content[..cut], TITLE_ELLIPSIS),
        None => content.to_string(),
    }
}

/// Groups messages (ascending by `created_at`) into chats, most recently
/// active first. Rows without a derivable id are skipped.
pub fn aggregate_chats(messages: &[StoredMessage], strategy: &ChatIdStrategy) -> Vec<Chat> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut accumulators: Vec<ChatAccumulator> = Vec::new();

    for message in messages {
        let Some(chat_id) = strategy.derive_id(message) else {
            tracing::debug!("Skipping message {} with no chat id", message.id);
            continue;
        };
        let slot = *index.entry(chat_id.clone()).or_insert_with(|| {
            accumulators.push(ChatAccumulator::new(chat_id, message.created_at));
            accumulators.len() - 1
        });
        accumulators[slot].push(message);
    }

    let mut chats: Vec<Chat> = accumulators
        .into_iter()
        .map(|acc| acc.finish(strategy))
        .collect();
    // Stable: ties keep first-seen order.
    chats.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
    chats
}

/// Rebuilds a single chat from the messages already scoped to it.
pub fn build_chat(chat_id: &str, messages: &[StoredMessage], strategy: &ChatIdStrategy) -> Option<Chat> {
    let first = messages.first()?;
    let mut acc = ChatAccumulator::new(chat_id.to_string(), first.created_at);
    for message in messages {
        acc.push(message);
    }
    Some(acc.finish(strategy))
}
