//! NoteNest embeddings
//!
//! Turns note text and search queries into fixed-width unit vectors the store
//! can compare with cosine distance.
//!
//! Providers:
//!
//! - **hf**: Hugging Face Inference API (default model `BAAI/bge-m3`)
//! - **openai**: OpenAI `/v1/embeddings` or any compatible endpoint
//! - **mock**: deterministic, offline. Good for tests and local runs.
//!
//! Providers disagree on vector width, so whatever comes back is pushed through
//! [`fit_to_dimension`]: truncate or zero-pad to the configured dimension, then
//! L2-normalize. Garbage in (NaN, all zeros) gives the zero vector out, never a
//! panic.
//!
//! Transport failures (connect errors, timeouts) are retried with exponential
//! backoff, three attempts by default. A provider that answers with an error
//! status is not retried.
//!
//! ## Quick example
//!
//! ```
//! use semantic::{Embedder, EmbeddingConfig};
//!
//! # async fn run() -> Result<(), semantic::EmbeddingError> {
//! let embedder = Embedder::from_config(&EmbeddingConfig::mock())?;
//! let v = embedder.embed("rust async runtimes").await?;
//! assert_eq!(v.len(), 1024);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod normalize;
pub mod provider;
pub mod retry;
mod serde_millis;
pub mod stub;
pub mod text;

pub use api::HttpEmbeddingProvider;
pub use config::{EmbeddingConfig, DEFAULT_EMBEDDING_DIMENSION};
pub use error::EmbeddingError;
pub use normalize::{fit_to_dimension, l2_normalize_in_place};
pub use provider::{build_provider, Embedder, EmbeddingProvider};
pub use retry::RetryConfig;
pub use stub::MockEmbeddingProvider;
pub use text::{clean_text, MAX_QUERY_CHARS};
