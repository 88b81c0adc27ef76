// src/config.rs
use crate::chat::ChatIdStrategy;
use crate::gemini_client::DEFAULT_GEMINI_MODEL;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 4002;
pub const DEFAULT_JWT_TTL_HOURS: i64 = 24;
const DEV_JWT_SECRET: &str = "default_secret";
pub const JWT_SECRET_BYTES: usize = 32;

pub const DEFAULT_CORS_ORIGINS: [&str; 3] = [
    "http://localhost:5173",
    "http://localhost:3000",
    "http://localhost:4000",
];

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub port: u16,
    pub frontend_url: Option<String>,
    pub production: bool,
    pub chat_id_strategy: ChatIdStrategy,
}

impl AppConfig {
    /// Reads the process environment (after `.env` has been loaded).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset.
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let production = get("APP_ENV").is_some_and(|env| env.eq_ignore_ascii_case("production"));

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) => secret,
            None if production => return Err(ConfigError::Missing("JWT_SECRET")),
            None => {
                tracing::warn!("JWT_SECRET not set, using an insecure development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let jwt_ttl_hours = match get("JWT_TTL_HOURS") {
            Some(raw) => match raw.parse::<i64>() {
                Ok(hours) if hours > 0 => hours,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "JWT_TTL_HOURS",
                        reason: format!("'{}' is not a positive number of hours", raw),
                    })
                }
            },
            None => DEFAULT_JWT_TTL_HOURS,
        };

        let port = match get("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                key: "PORT",
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let chat_id_strategy = match get("CHAT_ID_STRATEGY") {
            Some(raw) => raw.parse::<ChatIdStrategy>().map_err(|reason| ConfigError::Invalid {
                key: "CHAT_ID_STRATEGY",
                reason,
            })?,
            None => ChatIdStrategy::default(),
        };

        Ok(AppConfig {
            database_url,
            jwt_secret,
            jwt_ttl_hours,
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            port,
            frontend_url: get("FRONTEND_URL"),
            production,
            chat_id_strategy,
        })
    }

    pub fn environment(&self) -> &'static str {
        if self.production { "production" } else { "development" }
    }

    /// Localhost dev origins plus `FRONTEND_URL`, without duplicates.
    pub fn cors_origins(&self) -> Vec<String> {
        let mut origins: Vec<String> = DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect();
        if let Some(ref url) = self.frontend_url {
            let url = url.trim_end_matches('/').to_string();
            if !origins.contains(&url) {
                origins.push(url);
            }
        }
        origins
    }
}

/// Fresh HS256 signing secret, base64 encoded for `JWT_SECRET`.
pub fn random_jwt_secret() -> String {
    let mut key = [0u8; JWT_SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut key);
    STANDARD.encode(key)
}
