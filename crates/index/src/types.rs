use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hard ceiling on results returned by a single search or list call.
pub const MAX_RESULT_LIMIT: usize = 200;
/// Default number of notes returned by a list call.
pub const DEFAULT_LIST_LIMIT: usize = 50;
/// Largest offset a list call accepts; the SQL store binds it as `BIGINT`.
pub const MAX_LIST_OFFSET: usize = i64::MAX as usize;

/// A saved link with its human metadata. The stored embedding is not part of
/// the outward representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub url: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Text the lexical signal is computed over: `title + ' ' + description`.
    pub fn search_text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }

    /// True when every tag in `required` is present on this note.
    pub fn has_all_tags(&self, required: &[String]) -> bool {
        required.iter().all(|t| self.tags.iter().any(|own| own == t))
    }
}

/// Fields for a note about to be inserted. Text is expected to be cleaned
/// already; tags are normalized on insert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewNote {
    pub url: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteChanges {
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl NoteChanges {
    /// Whether applying these changes alters the embedded text of `note`.
    pub fn changes_text_of(&self, note: &Note) -> bool {
        self.title.as_ref().is_some_and(|t| *t != note.title)
            || self
                .description
                .as_ref()
                .is_some_and(|d| *d != note.description)
    }

    pub(crate) fn apply(&self, note: &mut Note) {
        if let Some(url) = &self.url {
            note.url = url.clone();
        }
        if let Some(title) = &self.title {
            note.title = title.clone();
        }
        if let Some(description) = &self.description {
            note.description = description.clone();
        }
        if let Some(tags) = &self.tags {
            note.tags = normalize_tags(tags);
        }
    }
}

/// One candidate from the store with both raw similarity signals.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub note: Note,
    /// `1 - cosine_distance`, clamped to `>= 0`.
    pub vector_similarity: f64,
    /// Trigram similarity of the query against [`Note::search_text`].
    pub lexical_similarity: f64,
}

/// A ranked search hit. Built per query, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedItem {
    pub note: Note,
    pub score: f64,
}

/// What the scorer asks of the store.
#[derive(Debug, Clone, PartialEq)]
pub struct HybridQuery {
    pub vector: Vec<f32>,
    pub text: String,
    /// AND filter; empty means no filter.
    pub tags: Vec<String>,
    /// Weight on the vector signal, already clamped to `[0, 1]`.
    pub vector_weight: f64,
    pub limit: usize,
}

impl HybridQuery {
    /// Composite used to order and cut the candidate set.
    pub fn blend(&self, vector_similarity: f64, lexical_similarity: f64) -> f64 {
        blend_scores(self.vector_weight, vector_similarity, lexical_similarity)
    }
}

/// Listing filter for the notes API.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub tags: Vec<String>,
    /// Fuzzy keyword matched against title and description.
    pub keyword: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            tags: Vec::new(),
            keyword: None,
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
        }
    }
}

impl ListQuery {
    /// Copy with `limit` clamped to `1..=200`, `offset` capped at
    /// [`MAX_LIST_OFFSET`] and blank inputs dropped.
    pub fn normalized(&self) -> Self {
        Self {
            tags: normalize_tags(&self.tags),
            keyword: self
                .keyword
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string),
            limit: self.limit.clamp(1, MAX_RESULT_LIMIT),
            offset: self.offset.min(MAX_LIST_OFFSET),
        }
    }
}

/// `w * v + (1 - w) * l`, with non-finite signals counted as zero.
pub fn blend_scores(weight: f64, vector_similarity: f64, lexical_similarity: f64) -> f64 {
    let v = if vector_similarity.is_finite() { vector_similarity } else { 0.0 };
    let l = if lexical_similarity.is_finite() { lexical_similarity } else { 0.0 };
    weight * v + (1.0 - weight) * l
}

/// Trim tags, drop blanks and duplicates, keep first-seen order.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}
