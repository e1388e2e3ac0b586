// src/config/mod.rs
// All tunables come from the environment (with a .env file if present).

use once_cell::sync::Lazy;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct TendConfig {
    // ── Server
    pub host: String,
    pub port: u16,

    // ── Database
    pub database_url: String,
    pub sqlite_max_connections: u32,

    // ── Classification policy (OpenAI-compatible)
    pub openai_base_url: String,
    pub openai_api_key: String,
    pub model: String,
    pub max_output_tokens: usize,

    // ── Workspace context bounds
    pub context_projects: usize,
    pub context_tasks: usize,
    pub context_notes: usize,
    pub context_files: usize,
    pub context_history: usize,

    // ── Notifications
    pub insight_min_chars: usize,
    pub notify_webhook_url: String,

    // ── Logging
    pub log_level: String,
}

fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => {
            let clean_val = val.split('#').next().unwrap_or("").trim();
            match clean_val.parse::<T>() {
                Ok(parsed) => parsed,
                Err(_) => {
                    eprintln!("Config: {} = '{}' (parse failed, using default)", key, val);
                    default
                }
            }
        }
        Err(_) => default,
    }
}

impl TendConfig {
    pub fn from_env() -> Self {
        // Missing .env is normal outside development.
        let _ = dotenvy::dotenv();

        Self {
            host: env_var_or("TEND_HOST", "0.0.0.0".to_string()),
            port: env_var_or("TEND_PORT", 3040),
            database_url: env_var_or("DATABASE_URL", "sqlite:./tend.db".to_string()),
            sqlite_max_connections: env_var_or("SQLITE_MAX_CONNECTIONS", 5),
            openai_base_url: env_var_or("OPENAI_BASE_URL", "https://api.openai.com".to_string()),
            openai_api_key: env_var_or("OPENAI_API_KEY", String::new()),
            model: env_var_or("TEND_MODEL", "gpt-4o".to_string()),
            max_output_tokens: env_var_or("TEND_MAX_OUTPUT_TOKENS", 4096),
            context_projects: env_var_or("TEND_CONTEXT_PROJECTS", 5),
            context_tasks: env_var_or("TEND_CONTEXT_TASKS", 20),
            context_notes: env_var_or("TEND_CONTEXT_NOTES", 10),
            context_files: env_var_or("TEND_CONTEXT_FILES", 10),
            context_history: env_var_or("TEND_CONTEXT_HISTORY", 6),
            insight_min_chars: env_var_or("TEND_INSIGHT_MIN_CHARS", 200),
            notify_webhook_url: env_var_or("TEND_NOTIFY_WEBHOOK_URL", String::new()),
            log_level: env_var_or("TEND_LOG_LEVEL", "info".to_string()),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn webhook_enabled(&self) -> bool {
        !self.notify_webhook_url.is_empty()
    }
}

pub static CONFIG: Lazy<TendConfig> = Lazy::new(TendConfig::from_env);
