// src/services/mod.rs
pub mod chat_service;
pub mod message_store;

pub use chat_service::{ChatError, ChatService};
pub use message_store::{MessageStore, PgMessageStore, StoreError};
