use rag::ChatSettings;
use semantic::EmbeddingConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::rate_limit::RateLimitConfig;

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Time allowed to produce response headers, in seconds. Streamed bodies
    /// are not cut by this.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Log filter directive (`info`, `server=debug,tower_http=info`, ...)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// CORS origins; `*` allows any.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Metrics endpoint enabled
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// PostgreSQL URL. Without one the server keeps notes in memory.
    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// Timeout for fetching a page to scrape metadata from, in seconds.
    #[serde(default = "default_scrape_timeout_secs")]
    pub scrape_timeout_secs: u64,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub chat: ChatSettings,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            log_level: default_log_level(),
            allowed_origins: default_allowed_origins(),
            metrics_enabled: default_true(),
            database_url: None,
            db_max_connections: default_db_max_connections(),
            scrape_timeout_secs: default_scrape_timeout_secs(),
            embedding: EmbeddingConfig::default(),
            chat: ChatSettings::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `.env`, an optional `notenest.{toml,yaml,json}`
    /// file, and `NOTENEST__*` environment variables, in that order.
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }

        let builder = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::with_name("notenest").required(false))
            // Override with environment variables
            .add_source(
                config::Environment::with_prefix("NOTENEST")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("allowed_origins")
                    .with_list_parse_key("rate_limit.protected_prefixes"),
            );

        let config: ServerConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that cannot work at all.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.rate_limit.validate()?;
        self.embedding.validate()?;
        if self.chat.top_k == 0 {
            anyhow::bail!("chat.top_k must be at least 1");
        }
        Ok(())
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Offline configuration: mock embeddings, mock chat, in-memory notes.
    pub fn offline() -> Self {
        Self {
            embedding: EmbeddingConfig::mock(),
            chat: ChatSettings::mock(),
            ..Self::default()
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:5173".to_string()]
}

fn default_db_max_connections() -> u32 {
    5
}

fn default_scrape_timeout_secs() -> u64 {
    20
}
