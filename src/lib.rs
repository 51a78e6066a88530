//! Workspace umbrella crate for NoteNest.
//!
//! NoteNest stores links as notes (URL, title, description, tags, embedding),
//! ranks them with a blend of vector and trigram similarity, and answers
//! questions over them with a streamed, cited chat.
//!
//! The pieces live in member crates and are re-exported here:
//!
//! - [`semantic`]: embedding providers, retry and [`fit_to_dimension`].
//! - [`index`]: the [`NoteStore`] collaborator and the [`HybridScorer`].
//! - [`chat`]: streaming chat providers behind [`ChatStreamProvider`].
//! - [`rag`]: the [`RagChatOrchestrator`] that joins them.
//!
//! The HTTP server is the separate `notenest-server` crate.
//!
//! ```
//! use notenest::{offline_orchestrator, ChatEvent, ChatMessage, ChatRequest};
//! use futures::StreamExt;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (orchestrator, _store) = offline_orchestrator().unwrap();
//! let events: Vec<ChatEvent> = orchestrator
//!     .start(ChatRequest {
//!         messages: vec![ChatMessage::user("hello")],
//!         ..Default::default()
//!     })
//!     .await
//!     .unwrap()
//!     .collect()
//!     .await;
//! assert_eq!(events.last(), Some(&ChatEvent::Done { citations: vec![] }));
//! # }
//! ```

use std::sync::Arc;

pub use chat::{
    ChatMessage, ChatProviderError, ChatProviderKind, ChatProviders, ChatProvidersConfig, ChatRole,
    ChatStreamProvider, TokenStream,
};
pub use index::{
    HybridScorer, InMemoryNoteStore, IndexError, ListQuery, NewNote, Note, NoteChanges, NoteStore,
    RetrievedItem,
};
pub use rag::{
    ChatEvent, ChatEventStream, ChatRequest, ChatSettings, Citation, RagChatOrchestrator, RagError,
    Retriever, SearchRequest,
};
pub use semantic::{
    clean_text, fit_to_dimension, l2_normalize_in_place, Embedder, EmbeddingConfig,
    EmbeddingError, EmbeddingProvider,
};

/// Orchestrator wired to mock embeddings, the mock chat provider and an empty
/// in-memory store. Needs no network and no credentials.
pub fn offline_orchestrator(
) -> Result<(RagChatOrchestrator, Arc<InMemoryNoteStore>), ChatProviderError> {
    let store = Arc::new(InMemoryNoteStore::new());
    let embedder = Embedder::new(
        Arc::new(semantic::MockEmbeddingProvider),
        semantic::DEFAULT_EMBEDDING_DIMENSION,
        semantic::RetryConfig::default(),
    );
    let providers = ChatProviders::from_config(ChatProvidersConfig::default())?;
    let retriever = Retriever::new(embedder, HybridScorer::new(store.clone()));
    Ok((
        RagChatOrchestrator::new(retriever, providers, ChatSettings::mock()),
        store,
    ))
}
