use chat::ChatProvidersConfig;
use serde::{Deserialize, Serialize};

/// Chat defaults plus the upstream provider table (the `chat` config section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// Provider used when a request names none.
    pub default_provider: String,
    /// Model used when a request names none.
    pub default_model: String,
    /// Notes retrieved per chat turn unless the request overrides it.
    pub top_k: usize,
    /// Events buffered between the relay task and the client.
    pub channel_capacity: usize,
    pub providers: ChatProvidersConfig,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            default_provider: "groq".to_string(),
            default_model: "openai/gpt-oss-120b".to_string(),
            top_k: 5,
            channel_capacity: 32,
            providers: ChatProvidersConfig::default(),
        }
    }
}

impl ChatSettings {
    /// Offline defaults: mock provider, no credentials needed.
    pub fn mock() -> Self {
        Self {
            default_provider: "mock".to_string(),
            ..Self::default()
        }
    }
}
