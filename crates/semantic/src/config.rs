use serde::{Deserialize, Serialize};

use crate::error::EmbeddingError;
use crate::retry::RetryConfig;

/// Default vector width for stored embeddings (bge-m3).
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1024;

/// Runtime configuration for the embedding stage.
///
/// Loaded as the `embedding` section of the server config, so every field has a
/// serde default and the section may be omitted entirely.
///
/// # Example
/// ```
/// use semantic::EmbeddingConfig;
///
/// let cfg = EmbeddingConfig {
///     provider: "mock".into(),
///     ..Default::default()
/// };
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider selector: `"hf"`, `"openai"` or `"mock"`.
    pub provider: String,
    /// Model identifier. Used in the HF URL path and the OpenAI request body.
    pub model: String,
    /// Override for the provider endpoint. When absent the provider's public
    /// endpoint for `model` is used.
    pub api_url: Option<String>,
    /// Bearer credential for remote providers.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Width every vector is fitted to before it reaches the store.
    pub embedding_dimension: usize,
    /// Per-request HTTP timeout in seconds.
    pub timeout_secs: u64,
    /// Backoff policy for transient transport failures.
    pub retry: RetryConfig,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "hf".into(),
            model: "BAAI/bge-m3".into(),
            api_url: None,
            api_key: None,
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            timeout_secs: 60,
            retry: RetryConfig::default(),
        }
    }
}

impl EmbeddingConfig {
    /// Offline configuration backed by the deterministic mock provider.
    pub fn mock() -> Self {
        Self {
            provider: "mock".into(),
            model: "mock".into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), EmbeddingError> {
        if self.embedding_dimension == 0 {
            return Err(EmbeddingError::InvalidConfig(
                "embedding_dimension must be greater than zero".into(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(EmbeddingError::InvalidConfig("model must not be empty".into()));
        }
        if let Some(url) = self.api_url.as_deref() {
            if url.trim().is_empty() {
                return Err(EmbeddingError::InvalidConfig("api_url must not be blank".into()));
            }
        }
        Ok(())
    }

    /// The credential, if one is configured and non-blank.
    pub fn credential(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_targets_bge_m3() {
        let cfg = EmbeddingConfig::default();
        assert_eq!(cfg.provider, "hf");
        assert_eq!(cfg.model, "BAAI/bge-m3");
        assert_eq!(cfg.embedding_dimension, 1024);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_dimension_is_rejected() {
        let cfg = EmbeddingConfig {
            embedding_dimension: 0,
            ..EmbeddingConfig::mock()
        };
        assert!(matches!(cfg.validate(), Err(EmbeddingError::InvalidConfig(_))));
    }

    #[test]
    fn blank_key_is_no_credential() {
        let cfg = EmbeddingConfig {
            api_key: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(cfg.credential(), None);
    }

    #[test]
    fn partial_section_uses_defaults() {
        let cfg: EmbeddingConfig = serde_json::from_str(r#"{"provider":"openai"}"#).unwrap();
        assert_eq!(cfg.provider, "openai");
        assert_eq!(cfg.embedding_dimension, 1024);
        assert_eq!(cfg.retry.max_retries, 2);
    }
}
