use thiserror::Error;

/// Errors surfaced while turning text into an embedding.
#[derive(Debug, Clone, Error)]
pub enum EmbeddingError {
    /// Configuration is inconsistent (e.g. zero dimension, empty endpoint).
    #[error("invalid embedding config: {0}")]
    InvalidConfig(String),
    /// A remote provider was selected but no credential was configured.
    #[error("missing credential for embedding provider '{0}'")]
    MissingCredential(String),
    /// The provider name is not one we know how to talk to.
    #[error("unsupported embedding provider '{0}'")]
    UnsupportedProvider(String),
    /// Network-level failure (connect, timeout, reset). Safe to retry.
    #[error("embedding transport failure: {0}")]
    Transport(String),
    /// The provider answered with a non-success status.
    #[error("embedding provider returned HTTP {status}: {message}")]
    Upstream { status: u16, message: String },
    /// The provider answered 2xx but the body was not an embedding.
    #[error("malformed embedding response: {0}")]
    MalformedResponse(String),
}

impl EmbeddingError {
    /// Only transport failures are retried; application-level answers never are.
    pub fn is_transient(&self) -> bool {
        matches!(self, EmbeddingError::Transport(_))
    }
}
