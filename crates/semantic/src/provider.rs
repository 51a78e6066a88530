use async_trait::async_trait;
use std::sync::Arc;

use crate::api::HttpEmbeddingProvider;
use crate::config::EmbeddingConfig;
use crate::error::EmbeddingError;
use crate::normalize::fit_to_dimension;
use crate::retry::{execute_with_retry_async, RetryConfig};
use crate::stub::MockEmbeddingProvider;

/// Something that turns text into a raw (unfitted) vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Short provider key used in logs (`"hf"`, `"openai"`, `"mock"`).
    fn name(&self) -> &str;

    /// One attempt at embedding `text`. Retries are the caller's job.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Construct the provider named by `cfg.provider`.
pub fn build_provider(cfg: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    cfg.validate()?;
    match cfg.provider.trim().to_ascii_lowercase().as_str() {
        "hf" | "huggingface" => Ok(Arc::new(HttpEmbeddingProvider::huggingface(cfg)?)),
        "openai" => Ok(Arc::new(HttpEmbeddingProvider::openai(cfg)?)),
        "mock" => Ok(Arc::new(MockEmbeddingProvider)),
        other => Err(EmbeddingError::UnsupportedProvider(other.to_string())),
    }
}

/// Provider + retry policy + dimension fitting.
///
/// Every vector that leaves an `Embedder` has exactly `dimension` values and
/// unit norm (or is all zeros for degenerate provider output).
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    dimension: usize,
    retry: RetryConfig,
}

impl std::fmt::Debug for Embedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedder")
            .field("provider", &self.provider.name())
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl Embedder {
    pub fn from_config(cfg: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let provider = build_provider(cfg)?;
        Ok(Self::new(provider, cfg.embedding_dimension, cfg.retry))
    }

    pub fn new(provider: Arc<dyn EmbeddingProvider>, dimension: usize, retry: RetryConfig) -> Self {
        Self {
            provider,
            dimension,
            retry,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Embed `text` and fit the result to the configured dimension.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let provider = &self.provider;
        let outcome = execute_with_retry_async(&self.retry, EmbeddingError::is_transient, |_| {
            provider.embed(text)
        })
        .await;

        match outcome.result {
            Ok(raw) => {
                if raw.len() != self.dimension {
                    tracing::debug!(
                        provider = provider.name(),
                        got = raw.len(),
                        want = self.dimension,
                        "fitting embedding to configured dimension"
                    );
                }
                Ok(fit_to_dimension(&raw, self.dimension))
            }
            Err(err) => {
                tracing::warn!(
                    provider = provider.name(),
                    attempts = outcome.attempts,
                    error = %err,
                    "embedding failed"
                );
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct Flaky {
        calls: AtomicU32,
        fail_times: u32,
        error: EmbeddingError,
    }

    #[async_trait]
    impl EmbeddingProvider for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_times {
                Err(self.error.clone())
            } else {
                Ok(vec![3.0, 4.0])
            }
        }
    }

    fn flaky(fail_times: u32, error: EmbeddingError) -> Arc<Flaky> {
        Arc::new(Flaky {
            calls: AtomicU32::new(0),
            fail_times,
            error,
        })
    }

    #[test]
    fn unsupported_provider() {
        let cfg = EmbeddingConfig {
            provider: "cohere".into(),
            ..EmbeddingConfig::mock()
        };
        assert!(matches!(
            build_provider(&cfg),
            Err(EmbeddingError::UnsupportedProvider(name)) if name == "cohere"
        ));
    }

    #[tokio::test]
    async fn mock_embedder_fits_dimension() {
        let cfg = EmbeddingConfig {
            embedding_dimension: 16,
            ..EmbeddingConfig::mock()
        };
        let embedder = Embedder::from_config(&cfg).unwrap();
        let v = embedder.embed("hello").await.unwrap();
        assert_eq!(v.len(), 16);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_errors_are_retried() {
        let provider = flaky(2, EmbeddingError::Transport("reset".into()));
        let embedder = Embedder::new(provider.clone(), 4, RetryConfig::default());
        let v = embedder.embed("x").await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert_eq!(v.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_three_attempts() {
        let provider = flaky(10, EmbeddingError::Transport("timeout".into()));
        let embedder = Embedder::new(provider.clone(), 4, RetryConfig::default());
        assert!(embedder.embed("x").await.is_err());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn upstream_errors_are_not_retried() {
        let provider = flaky(
            10,
            EmbeddingError::Upstream {
                status: 503,
                message: "loading".into(),
            },
        );
        let retry = RetryConfig::default().with_base_delay(Duration::from_millis(1));
        let embedder = Embedder::new(provider.clone(), 4, retry);
        let err = embedder.embed("x").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Upstream { status: 503, .. }));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }
}
