use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::similarity::{cosine_similarity, trigram_similarity, TRIGRAM_MATCH_THRESHOLD};
use crate::types::{
    normalize_tags, HybridQuery, ListQuery, NewNote, Note, NoteChanges, ScoredCandidate,
};
use crate::IndexError;

/// Storage collaborator for notes and their embeddings.
///
/// Implementations own both similarity primitives. The scorer only decides
/// weighting, ordering, and truncation.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Candidates matching `query.tags` (AND), each with raw vector and lexical
    /// similarity, ordered by `query.blend(..)` descending and cut to
    /// `query.limit`.
    async fn hybrid_candidates(&self, query: &HybridQuery)
        -> Result<Vec<ScoredCandidate>, IndexError>;

    /// Store a new note with its fitted embedding.
    async fn insert(&self, note: NewNote, embedding: Vec<f32>) -> Result<Note, IndexError>;

    async fn get(&self, id: Uuid) -> Result<Option<Note>, IndexError>;

    /// Apply `changes`, replacing the embedding when one is given, and bump
    /// `updated_at`. `None` when the note does not exist.
    async fn update(
        &self,
        id: Uuid,
        changes: NoteChanges,
        embedding: Option<Vec<f32>>,
    ) -> Result<Option<Note>, IndexError>;

    /// `true` when a note was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, IndexError>;

    async fn list(&self, query: &ListQuery) -> Result<Vec<Note>, IndexError>;
}

#[derive(Debug, Clone)]
struct StoredNote {
    note: Note,
    embedding: Vec<f32>,
}

/// An in-memory store using a `RwLock` around a `HashMap`.
///
/// Similarity is computed in-process with the same semantics as the Postgres
/// operators, so it stands in for the database in tests and local runs.
#[derive(Debug, Default)]
pub struct InMemoryNoteStore {
    notes: RwLock<HashMap<Uuid, StoredNote>>,
}

impl InMemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.notes.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The stored embedding for `id`, if any.
    pub fn embedding(&self, id: Uuid) -> Option<Vec<f32>> {
        self.notes
            .read()
            .ok()
            .and_then(|g| g.get(&id).map(|s| s.embedding.clone()))
    }
}

fn poisoned() -> IndexError {
    IndexError::backend("poisoned lock")
}

#[async_trait]
impl NoteStore for InMemoryNoteStore {
    async fn hybrid_candidates(
        &self,
        query: &HybridQuery,
    ) -> Result<Vec<ScoredCandidate>, IndexError> {
        let guard = self.notes.read().map_err(|_| poisoned())?;
        let mut candidates: Vec<(f64, ScoredCandidate)> = guard
            .values()
            .filter(|stored| stored.note.has_all_tags(&query.tags))
            .map(|stored| {
                let vector_similarity = cosine_similarity(&query.vector, &stored.embedding);
                let lexical_similarity =
                    trigram_similarity(&query.text, &stored.note.search_text());
                let blended = query.blend(vector_similarity, lexical_similarity);
                (
                    blended,
                    ScoredCandidate {
                        note: stored.note.clone(),
                        vector_similarity,
                        lexical_similarity,
                    },
                )
            })
            .collect();
        drop(guard);

        // HashMap order is arbitrary; break ties on recency for a stable answer.
        candidates.sort_by(|(a, ca), (b, cb)| {
            b.total_cmp(a)
                .then_with(|| cb.note.updated_at.cmp(&ca.note.updated_at))
        });
        candidates.truncate(query.limit);
        Ok(candidates.into_iter().map(|(_, c)| c).collect())
    }

    async fn insert(&self, new: NewNote, embedding: Vec<f32>) -> Result<Note, IndexError> {
        let now = Utc::now();
        let note = Note {
            id: Uuid::new_v4(),
            url: new.url,
            title: new.title,
            description: new.description,
            tags: normalize_tags(&new.tags),
            created_at: now,
            updated_at: now,
        };
        self.notes.write().map_err(|_| poisoned())?.insert(
            note.id,
            StoredNote {
                note: note.clone(),
                embedding,
            },
        );
        Ok(note)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Note>, IndexError> {
        let guard = self.notes.read().map_err(|_| poisoned())?;
        Ok(guard.get(&id).map(|s| s.note.clone()))
    }

    async fn update(
        &self,
        id: Uuid,
        changes: NoteChanges,
        embedding: Option<Vec<f32>>,
    ) -> Result<Option<Note>, IndexError> {
        let mut guard = self.notes.write().map_err(|_| poisoned())?;
        let Some(stored) = guard.get_mut(&id) else {
            return Ok(None);
        };
        changes.apply(&mut stored.note);
        if let Some(embedding) = embedding {
            stored.embedding = embedding;
        }
        stored.note.updated_at = Utc::now();
        Ok(Some(stored.note.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, IndexError> {
        Ok(self
            .notes
            .write()
            .map_err(|_| poisoned())?
            .remove(&id)
            .is_some())
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<Note>, IndexError> {
        let query = query.normalized();
        let guard = self.notes.read().map_err(|_| poisoned())?;
        let mut rows: Vec<(f64, Note)> = guard
            .values()
            .filter(|s| s.note.has_all_tags(&query.tags))
            .filter_map(|s| match query.keyword.as_deref() {
                Some(keyword) => {
                    let sim = trigram_similarity(keyword, &s.note.search_text());
                    (sim > TRIGRAM_MATCH_THRESHOLD).then(|| (sim, s.note.clone()))
                }
                None => Some((0.0, s.note.clone())),
            })
            .collect();
        drop(guard);

        rows.sort_by(|(sa, a), (sb, b)| {
            sb.total_cmp(sa)
                .then_with(|| b.updated_at.cmp(&a.updated_at))
        });
        Ok(rows
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .map(|(_, note)| note)
            .collect())
    }
}

/// Postgres + pgvector + pg_trgm store.
#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "postgres")]
pub use postgres::PgNoteStore;
