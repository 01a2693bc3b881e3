use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_queue_size: usize,
    pub event_buffer_size: usize,
    pub seed_demo_data: bool,
    pub ai: AiConfig,
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub base_url: String,
    /// No key disables the upstream call; every request takes the fallback path.
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_ms: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://oi-server.onrender.com".to_string(),
            api_key: None,
            model: "openrouter/anthropic/claude-sonnet-4".to_string(),
            timeout_ms: 15_000,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let defaults = AiConfig::default();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            event_queue_size: parse_or_default("EVENT_QUEUE_SIZE", 1024)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            seed_demo_data: parse_or_default("SEED_DEMO_DATA", false)?,
            ai: AiConfig {
                base_url: env::var("AI_BASE_URL").unwrap_or(defaults.base_url),
                api_key: env::var("AI_API_KEY").ok().filter(|key| !key.trim().is_empty()),
                model: env::var("AI_MODEL").unwrap_or(defaults.model),
                timeout_ms: parse_or_default("AI_TIMEOUT_MS", defaults.timeout_ms)?,
            },
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
