//! # NoteNest RAG
//!
//! Ties the other crates together for one chat turn:
//!
//! 1. take the latest user message as the retrieval query,
//! 2. embed it ([`semantic::Embedder`]) and rank notes ([`index::HybridScorer`]),
//! 3. render the hits as numbered context blocks with matching [`Citation`]s,
//! 4. stream the upstream model's answer ([`chat::ChatProviders`]) as
//!    [`ChatEvent`]s, ending with exactly one `Error` or `Done { citations }`.
//!
//! Retrieval happens before the stream exists, so its failures come back from
//! [`RagChatOrchestrator::start`] as a plain [`RagError`].

mod context;
mod error;
mod orchestrator;
mod retriever;
mod settings;
mod types;

pub use context::{build_prompt, render_context, CONTEXT_PREFIX, NO_CONTEXT_NOTICE, SYSTEM_PROMPT};
pub use error::RagError;
pub use orchestrator::{ChatEventStream, Phase, RagChatOrchestrator};
pub use retriever::Retriever;
pub use settings::ChatSettings;
pub use types::{ChatEvent, ChatRequest, Citation, SearchRequest};
