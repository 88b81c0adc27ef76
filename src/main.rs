use chat_backend::{
    build_router, db,
    gemini_client::{GeminiClient, TextGenerator},
    services::PgMessageStore,
    AppConfig, AppState, ChatService,
};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging()?;

    let config = AppConfig::from_env()?;
    tracing::info!(
        "Configuration - environment: {}, port: {}, chat ids: {}, Gemini: {}",
        config.environment(),
        config.port,
        config.chat_id_strategy.as_str(),
        if config.gemini_api_key.is_some() { "configured" } else { "not configured" }
    );

    let db_pool = db::create_pool(&config.database_url).await?;

    // Without a key every prompt gets the fallback reply
    let generator: Option<Arc<dyn TextGenerator>> = match config.gemini_api_key.clone() {
        Some(api_key) => {
            tracing::info!("Initializing Gemini client ({})...", config.gemini_model);
            let client: Arc<dyn TextGenerator> = Arc::new(GeminiClient::new(api_key, config.gemini_model.clone()));
            Some(client)
        }
        None => {
            tracing::warn!("GEMINI_API_KEY not found. Prompts will receive a fallback reply.");
            None
        }
    };

    let chats = ChatService::new(
        Arc::new(PgMessageStore::new(db_pool.clone())),
        generator,
        config.chat_id_strategy,
    );

    let port = config.port;
    let shared_state = Arc::new(AppState { db_pool, config, chats });
    let app = build_router(shared_state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,chat_backend=trace,sqlx=info,reqwest=info,hyper=info,tower=info".to_string()
        } else {
            "info,chat_backend=info,sqlx=warn,reqwest=warn,hyper=warn,tower=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::info!("Chat backend starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Build mode: {}", if cfg!(debug_assertions) { "development" } else { "production" });
    tracing::info!("Log level: {}", log_level);

    Ok(())
}
