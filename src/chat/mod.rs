// src/chat/mod.rs
pub mod aggregate;
pub mod strategy;

pub use aggregate::{aggregate_chats, build_chat, chat_title, Chat};
pub use strategy::{ChatIdStrategy, ChatScope};
