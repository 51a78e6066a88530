//! # NoteNest Index
//!
//! Storage and ranking for notes: saved links with a title, a description,
//! tags and an embedding of the text.
//!
//! ## Core pieces
//!
//! - **[`NoteStore`]**: the storage collaborator. It owns persistence, the tag
//!   predicate, and both similarity primitives (cosine distance and trigram
//!   similarity). Two implementations ship:
//!   - [`InMemoryNoteStore`]: a `RwLock<HashMap>` with in-process similarity,
//!     ideal for tests and local runs.
//!   - `PgNoteStore`: PostgreSQL with pgvector and pg_trgm (enabled via the
//!     `postgres` feature, on by default).
//! - **[`HybridScorer`]**: blends the two signals,
//!   `score = w * vector + (1 - w) * lexical`, sorts and truncates.
//!
//! ## Example Usage
//!
//! ```
//! use index::{HybridScorer, InMemoryNoteStore, NewNote, NoteStore};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), index::IndexError> {
//! let store = Arc::new(InMemoryNoteStore::new());
//! store
//!     .insert(
//!         NewNote {
//!             url: "https://tokio.rs".into(),
//!             title: "Tokio".into(),
//!             description: "An asynchronous runtime for Rust".into(),
//!             tags: vec!["rust".into()],
//!         },
//!         vec![1.0, 0.0],
//!     )
//!     .await?;
//!
//! let scorer = HybridScorer::new(store);
//! let hits = scorer.search(&[1.0, 0.0], "async runtime", None, 0.7, Some(5)).await?;
//! assert_eq!(hits[0].note.title, "Tokio");
//! # Ok(())
//! # }
//! ```

use thiserror::Error;

pub mod backend;
pub mod query;
pub mod similarity;
pub mod types;

pub use backend::{InMemoryNoteStore, NoteStore};
#[cfg(feature = "postgres")]
pub use backend::PgNoteStore;
pub use query::{clamp_top_k, clamp_weight, HybridScorer, DEFAULT_HYBRID_WEIGHT, DEFAULT_TOP_K};
pub use similarity::{cosine_similarity, trigram_similarity};
pub use types::{
    blend_scores, normalize_tags, HybridQuery, ListQuery, NewNote, Note, NoteChanges,
    RetrievedItem, ScoredCandidate, DEFAULT_LIST_LIMIT, MAX_LIST_OFFSET, MAX_RESULT_LIMIT,
};

/// Retrieval failure: anything that went wrong talking to the store.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    #[cfg(feature = "postgres")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl IndexError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }
}
