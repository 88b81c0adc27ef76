// Chat operations over the message store: list, open, retitle, delete, and
// prompt submission with a fallback reply when generation fails.

use super::message_store::{MessageStore, StoreError};
use crate::chat::{
    aggregate_chats, build_chat,
    strategy::{bucket_id, MAX_CHAT_ID_LEN},
    ChatIdStrategy,
};
use crate::gemini_client::TextGenerator;
use crate::models::chat::{ChatDetail, ChatSummary, NewMessage, PromptResponse};
use std::sync::Arc;
use thiserror::Error;

pub const FALLBACK_REPLY: &str = "Sorry, I couldn't generate a response right now. Please try again.";

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("Chat not found")]
    ChatNotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TitleUpdate {
    pub chat_id: String,
    pub title: String,
}

pub struct ChatService {
    store: Arc<dyn MessageStore>,
    generator: Option<Arc<dyn TextGenerator>>,
    strategy: ChatIdStrategy,
}

impl ChatService {
    pub fn new(
        store: Arc<dyn MessageStore>,
        generator: Option<Arc<dyn TextGenerator>>,
        strategy: ChatIdStrategy,
    ) -> Self {
        Self { store, generator, strategy }
    }

    pub async fn list_chats(&self, user_id: i32) -> Result<Vec<ChatSummary>, ChatError> {
        let messages = self.store.list_for_user(user_id).await?;
        tracing::debug!("Found {} messages for user {}", messages.len(), user_id);

        let chats = aggregate_chats(&messages, &self.strategy);
        Ok(chats.iter().map(|chat| chat.summary()).collect())
    }

    pub async fn get_chat(&self, user_id: i32, chat_id: &str) -> Result<ChatDetail, ChatError> {
        let scope = self.strategy.scope(chat_id);
        let messages = self.store.list_in_scope(user_id, &scope).await?;
        tracing::debug!("Found {} messages in chat {} for user {}", messages.len(), chat_id, user_id);

        build_chat(chat_id, &messages, &self.strategy)
            .map(|chat| chat.into_detail())
            .ok_or(ChatError::ChatNotFound)
    }

    /// Titles are kept client-side; this only validates and echoes.
    pub fn rename_chat(&self, chat_id: &str, title: Option<&str>) -> Result<TitleUpdate, ChatError> {
        let title = title.map(str::trim).unwrap_or_default();
        if title.is_empty() {
            return Err(ChatError::InvalidInput("Title is required".to_string()));
        }
        Ok(TitleUpdate { chat_id: chat_id.to_string(), title: title.to_string() })
    }

    pub async fn delete_chat(&self, user_id: i32, chat_id: &str) -> Result<u64, ChatError> {
        let scope = self.strategy.scope(chat_id);
        let deleted = self.store.delete_in_scope(user_id, &scope).await?;
        tracing::info!("Deleted {} messages from chat {} for user {}", deleted, chat_id, user_id);
        Ok(deleted)
    }

    pub async fn submit_prompt(
        &self,
        user_id: i32,
        content: Option<&str>,
        chat_id: Option<&str>,
    ) -> Result<PromptResponse, ChatError> {
        let content = match content {
            Some(content) if !content.trim().is_empty() => content,
            _ => return Err(ChatError::InvalidInput("Content is required".to_string())),
        };

        let too_long = chat_id.is_some_and(|id| id.trim().chars().count() > MAX_CHAT_ID_LEN);
        if self.strategy == ChatIdStrategy::Explicit && too_long {
            return Err(ChatError::InvalidInput(format!(
                "Chat id must be at most {} characters",
                MAX_CHAT_ID_LEN
            )));
        }

        let stored_chat_id = self.strategy.resolve_chat_id(chat_id);
        let user_message = self
            .store
            .insert(NewMessage::user(user_id, stored_chat_id.clone(), content.to_string()))
            .await?;

        let effective_chat_id = stored_chat_id
            .clone()
            .unwrap_or_else(|| bucket_id(user_message.created_at));

        let reply = self.generate_reply(content, &effective_chat_id).await;

        self.store
            .insert(NewMessage::assistant(user_id, stored_chat_id, reply.clone()))
            .await?;

        Ok(PromptResponse { reply, chat_id: effective_chat_id })
    }

    async fn generate_reply(&self, content: &str, chat_id: &str) -> String {
        let Some(ref generator) = self.generator else {
            tracing::warn!("No text generator configured, sending fallback reply for chat {}", chat_id);
            return FALLBACK_REPLY.to_string();
        };

        match generator.generate(content).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                tracing::warn!("Generator returned empty text for chat {}", chat_id);
                FALLBACK_REPLY.to_string()
            }
            Err(e) => {
                tracing::warn!("Text generation failed for chat {}: {}", chat_id, e);
                FALLBACK_REPLY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::strategy::CHAT_ID_LEN;
    use crate::models::chat::Role;
    use crate::services::message_store::InMemoryMessageStore;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};

    struct EchoGenerator;

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
            Ok(format!("echo: {}", prompt))
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
            Err("upstream timeout".into())
        }
    }

    fn service(store: Arc<InMemoryMessageStore>, generator: Option<Arc<dyn TextGenerator>>, strategy: ChatIdStrategy) -> ChatService {
        ChatService::new(store, generator, strategy)
    }

    fn echo() -> Option<Arc<dyn TextGenerator>> {
        Some(Arc::new(EchoGenerator))
    }

    #[tokio::test]
    async fn test_list_with_no_messages_is_empty() {
        let store = Arc::new(InMemoryMessageStore::new());
        let chats = service(store, echo(), ChatIdStrategy::Explicit).list_chats(1).await.unwrap();
        assert!(chats.is_empty());
    }

    #[tokio::test]
    async fn test_submit_then_list_and_get() {
        let store = Arc::new(InMemoryMessageStore::new());
        let svc = service(store.clone(), echo(), ChatIdStrategy::Explicit);

        let reply = svc.submit_prompt(1, Some("Hi"), None).await.unwrap();
        assert_eq!(reply.reply, "echo: Hi");
        assert_eq!(reply.chat_id.len(), CHAT_ID_LEN);

        let chats = svc.list_chats(1).await.unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].id, reply.chat_id);
        assert_eq!(chats[0].title, "Hi");
        assert_eq!(chats[0].message_count, 2);

        let chat = svc.get_chat(1, &reply.chat_id).await.unwrap();
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[0].role, Role::User);
        assert_eq!(chat.messages[1].content, "echo: Hi");
    }

    #[tokio::test]
    async fn test_supplied_chat_id_is_reused() {
        let store = Arc::new(InMemoryMessageStore::new());
        let svc = service(store.clone(), echo(), ChatIdStrategy::Explicit);

        let first = svc.submit_prompt(1, Some("one"), None).await.unwrap();
        let second = svc.submit_prompt(1, Some("two"), Some(&first.chat_id)).await.unwrap();
        assert_eq!(first.chat_id, second.chat_id);

        let chats = svc.list_chats(1).await.unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].message_count, 4);
        assert_eq!(chats[0].title, "one");
    }

    #[tokio::test]
    async fn test_blank_content_rejected_without_writes() {
        let store = Arc::new(InMemoryMessageStore::new());
        let svc = service(store.clone(), echo(), ChatIdStrategy::Explicit);

        for content in [None, Some(""), Some("   \n\t")] {
            let err = svc.submit_prompt(1, content, None).await.unwrap_err();
            assert!(matches!(err, ChatError::InvalidInput(ref m) if m == "Content is required"));
        }
        assert!(store.rows().await.is_empty());
    }

    #[tokio::test]
    async fn test_overlong_chat_id_rejected_without_writes() {
        let store = Arc::new(InMemoryMessageStore::new());
        let svc = service(store.clone(), echo(), ChatIdStrategy::Explicit);

        let long_id = "x".repeat(MAX_CHAT_ID_LEN + 1);
        let err = svc.submit_prompt(1, Some("Hi"), Some(&long_id)).await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidInput(_)));
        assert!(store.rows().await.is_empty());

        let max_id = "y".repeat(MAX_CHAT_ID_LEN);
        let reply = svc.submit_prompt(1, Some("Hi"), Some(&max_id)).await.unwrap();
        assert_eq!(reply.chat_id, max_id);
    }

    #[tokio::test]
    async fn test_generation_failure_uses_fallback_and_persists_both() {
        let store = Arc::new(InMemoryMessageStore::new());
        let svc = service(store.clone(), Some(Arc::new(FailingGenerator)), ChatIdStrategy::Explicit);

        let reply = svc.submit_prompt(1, Some("Hello?"), None).await.unwrap();
        assert_eq!(reply.reply, FALLBACK_REPLY);

        let rows = store.rows().await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].role, Role::User);
        assert_eq!(rows[1].role, Role::Assistant);
        assert_eq!(rows[1].content, FALLBACK_REPLY);
        assert_eq!(rows[1].chat_id.as_deref(), Some(reply.chat_id.as_str()));
    }

    #[tokio::test]
    async fn test_missing_generator_uses_fallback() {
        let store = Arc::new(InMemoryMessageStore::new());
        let svc = service(store, None, ChatIdStrategy::Explicit);
        let reply = svc.submit_prompt(1, Some("anyone there"), None).await.unwrap();
        assert_eq!(reply.reply, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn test_assistant_write_failure_keeps_user_message() {
        let store = Arc::new(InMemoryMessageStore::new());
        store.fail_inserts_after(1).await;
        let svc = service(store.clone(), echo(), ChatIdStrategy::Explicit);

        let err = svc.submit_prompt(1, Some("Hi"), None).await.unwrap_err();
        assert!(matches!(err, ChatError::Store(_)));

        let rows = store.rows().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].role, Role::User);
    }

    #[tokio::test]
    async fn test_get_unknown_chat_is_not_found() {
        let store = Arc::new(InMemoryMessageStore::new());
        let svc = service(store, echo(), ChatIdStrategy::Explicit);
        assert!(matches!(svc.get_chat(1, "nope").await, Err(ChatError::ChatNotFound)));
    }

    #[tokio::test]
    async fn test_chats_are_scoped_to_user() {
        let store = Arc::new(InMemoryMessageStore::new());
        let svc = service(store, echo(), ChatIdStrategy::Explicit);

        let mine = svc.submit_prompt(1, Some("mine"), Some("shared-id")).await.unwrap();
        svc.submit_prompt(2, Some("theirs"), Some("shared-id")).await.unwrap();

        let chat = svc.get_chat(1, &mine.chat_id).await.unwrap();
        assert_eq!(chat.message_count, 2);
        assert_eq!(chat.title, "mine");
        assert_eq!(svc.list_chats(2).await.unwrap().len(), 1);

        assert_eq!(svc.delete_chat(2, "shared-id").await.unwrap(), 2);
        assert_eq!(svc.get_chat(1, "shared-id").await.unwrap().message_count, 2);
    }

    #[tokio::test]
    async fn test_delete_unknown_chat_removes_nothing() {
        let store = Arc::new(InMemoryMessageStore::new());
        let svc = service(store, echo(), ChatIdStrategy::Explicit);
        assert_eq!(svc.delete_chat(1, "does-not-exist").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let store = Arc::new(InMemoryMessageStore::new());
        let svc = service(store, echo(), ChatIdStrategy::Explicit);

        let reply = svc.submit_prompt(1, Some("bye"), None).await.unwrap();
        assert_eq!(svc.delete_chat(1, &reply.chat_id).await.unwrap(), 2);
        assert!(matches!(svc.get_chat(1, &reply.chat_id).await, Err(ChatError::ChatNotFound)));
        assert!(svc.list_chats(1).await.unwrap().is_empty());
    }

    #[test]
    fn test_rename_validates_and_trims() {
        let svc = service(Arc::new(InMemoryMessageStore::new()), None, ChatIdStrategy::Explicit);
        let update = svc.rename_chat("c1", Some("  Trip plans ")).unwrap();
        assert_eq!(update, TitleUpdate { chat_id: "c1".into(), title: "Trip plans".into() });

        assert!(matches!(svc.rename_chat("c1", Some("  ")), Err(ChatError::InvalidInput(_))));
        assert!(matches!(svc.rename_chat("c1", None), Err(ChatError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_store_outage_surfaces_as_store_error() {
        let store = Arc::new(InMemoryMessageStore::new());
        store.set_offline(true);
        let svc = service(store, echo(), ChatIdStrategy::Explicit);
        assert!(matches!(svc.list_chats(1).await, Err(ChatError::Store(_))));
        assert!(matches!(svc.submit_prompt(1, Some("hi"), None).await, Err(ChatError::Store(_))));
    }

    #[tokio::test]
    async fn test_bucket_strategy_round_trip() {
        let store = Arc::new(InMemoryMessageStore::new());
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 9, 10, 0).unwrap();
        store.set_clock(start).await;
        let svc = service(store.clone(), echo(), ChatIdStrategy::Bucket);

        let reply = svc.submit_prompt(1, Some("first"), Some("ignored")).await.unwrap();
        assert_eq!(reply.chat_id, bucket_id(start));
        assert!(store.rows().await.iter().all(|m| m.chat_id.is_none()));

        let chat = svc.get_chat(1, &reply.chat_id).await.unwrap();
        assert_eq!(chat.message_count, 2);
        assert_eq!(chat.title, "first");

        store.set_clock(start + Duration::hours(2)).await;
        svc.submit_prompt(1, Some("later"), None).await.unwrap();
        let chats = svc.list_chats(1).await.unwrap();
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[1].id, reply.chat_id);

        assert_eq!(svc.delete_chat(1, &reply.chat_id).await.unwrap(), 2);
        assert_eq!(svc.list_chats(1).await.unwrap().len(), 1);
    }
}
