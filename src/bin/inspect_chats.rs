// Print how a user's stored messages group into chats
use chat_backend::chat::aggregate_chats;
use chat_backend::services::{MessageStore, PgMessageStore};
use chat_backend::AppConfig;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let email = std::env::args()
        .nth(1)
        .ok_or("usage: inspect_chats <email>")?
        .trim()
        .to_lowercase();

    let config = AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await?;

    let user_id = sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| format!("no user with email {}", email))?;

    let store = PgMessageStore::new(pool.clone());
    let messages = store.list_for_user(user_id).await?;
    let chats = aggregate_chats(&messages, &config.chat_id_strategy);

    println!(
        "\n=== {} messages in {} chats for {} (strategy: {}) ===\n",
        messages.len(),
        chats.len(),
        email,
        config.chat_id_strategy.as_str()
    );

    for chat in &chats {
        println!(
            "Chat: {:<14} | Messages: {:<4} | Last: {} | Title: {}",
            chat.id,
            chat.message_count,
            chat.last_updated.format("%Y-%m-%d %H:%M:%S UTC"),
            chat.title
        );
    }

    let ungrouped = messages.iter().filter(|m| config.chat_id_strategy.derive_id(m).is_none()).count();
    if ungrouped > 0 {
        println!("\n{} messages carry no chat id and are not listed", ungrouped);
    }

    pool.close().await;
    Ok(())
}
