use serde::{Deserialize, Serialize};
use std::env;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    pub gemini_model: String,
    pub proxy_api_key: Option<String>,
    pub proxy_upstream_url: String,
    pub database_url: String,
    pub bind_addr: String,
}

/// `DATABASE_URL` value that selects the in-process store instead of SQLite.
pub const MEMORY_DATABASE_URL: &str = "memory";

impl Config {
    /// Credentials are read but not required here; a missing key surfaces
    /// when the integration that needs it is called.
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        bind_addr
            .parse::<std::net::SocketAddr>()
            .map_err(|e| anyhow::anyhow!("BIND_ADDR {bind_addr:?} is not a socket address: {e}"))?;

        Ok(Config {
            gemini_api_key: non_empty_var("GEMINI_API_KEY"),
            gemini_base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".to_string()),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
            proxy_api_key: non_empty_var("PROXY_API_KEY"),
            proxy_upstream_url: env::var("PROXY_UPSTREAM_URL").unwrap_or_else(|_| {
                "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent"
                    .to_string()
            }),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./movie_cache.db?mode=rwc".to_string()),
            bind_addr,
        })
    }

    pub fn warn_missing_credentials(&self) {
        if self.gemini_api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY not set; movie lookups will fail until it is provided");
        }
        if self.proxy_api_key.is_none() {
            tracing::warn!("PROXY_API_KEY not set; /api/generate will answer with errors");
        }
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url == MEMORY_DATABASE_URL
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
