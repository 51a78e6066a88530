use thiserror::Error;

/// Failures that end a request before any event is streamed.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("embedding failed: {0}")]
    Embedding(#[from] semantic::EmbeddingError),
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] index::IndexError),
}
