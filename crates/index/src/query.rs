use std::sync::Arc;

use crate::types::{normalize_tags, HybridQuery, RetrievedItem, MAX_RESULT_LIMIT};
use crate::{IndexError, NoteStore};

/// Weight on the vector signal when the caller gives none (or gives NaN).
pub const DEFAULT_HYBRID_WEIGHT: f64 = 0.7;
/// Results returned when the caller gives no `top_k`.
pub const DEFAULT_TOP_K: usize = 10;

/// Blends vector and lexical similarity into one ranking.
///
/// The store computes both raw signals and applies the tag predicate; this type
/// owns the weighting contract, the ordering and the cut.
#[derive(Clone)]
pub struct HybridScorer {
    store: Arc<dyn NoteStore>,
}

impl std::fmt::Debug for HybridScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridScorer").finish_non_exhaustive()
    }
}

/// Clamp a caller-supplied weight to `[0, 1]`; non-finite falls back to 0.7.
pub fn clamp_weight(weight: f64) -> f64 {
    if weight.is_finite() {
        weight.clamp(0.0, 1.0)
    } else {
        DEFAULT_HYBRID_WEIGHT
    }
}

/// Clamp `top_k` to `1..=200`, defaulting to 10.
pub fn clamp_top_k(top_k: Option<usize>) -> usize {
    top_k.unwrap_or(DEFAULT_TOP_K).clamp(1, MAX_RESULT_LIMIT)
}

impl HybridScorer {
    pub fn new(store: Arc<dyn NoteStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn NoteStore> {
        &self.store
    }

    /// Rank notes against a query vector and query text.
    ///
    /// Blank `text` returns no results without touching the store. Scores are
    /// `w * vector + (1 - w) * lexical` with `w` clamped; results are sorted by
    /// score descending (stable, so ties keep the store's order) and cut to
    /// the clamped `top_k`. Store errors propagate unretried.
    pub async fn search(
        &self,
        vector: &[f32],
        text: &str,
        tags: Option<&[String]>,
        weight: f64,
        top_k: Option<usize>,
    ) -> Result<Vec<RetrievedItem>, IndexError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let query = HybridQuery {
            vector: vector.to_vec(),
            text: text.to_string(),
            tags: tags.map(normalize_tags).unwrap_or_default(),
            vector_weight: clamp_weight(weight),
            limit: clamp_top_k(top_k),
        };

        let candidates = self.store.hybrid_candidates(&query).await.inspect_err(|err| {
            tracing::error!(error = %err, "hybrid retrieval failed");
        })?;

        let mut results: Vec<RetrievedItem> = candidates
            .into_iter()
            .map(|c| RetrievedItem {
                score: query.blend(c.vector_similarity, c.lexical_similarity),
                note: c.note,
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(query.limit);

        tracing::debug!(
            hits = results.len(),
            limit = query.limit,
            weight = query.vector_weight,
            "hybrid search complete"
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ListQuery, NewNote, Note, NoteChanges, ScoredCandidate};
    use crate::InMemoryNoteStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use uuid::Uuid;

    /// Store double that returns canned candidates and records the last query.
    #[derive(Default)]
    struct CannedStore {
        candidates: Vec<ScoredCandidate>,
        calls: AtomicUsize,
        last_query: Mutex<Option<HybridQuery>>,
        fail: bool,
    }

    #[async_trait]
    impl NoteStore for CannedStore {
        async fn hybrid_candidates(
            &self,
            query: &HybridQuery,
        ) -> Result<Vec<ScoredCandidate>, IndexError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_query.lock().unwrap() = Some(query.clone());
            if self.fail {
                return Err(IndexError::backend("connection refused"));
            }
            Ok(self.candidates.iter().take(query.limit).cloned().collect())
        }

        async fn insert(&self, _: NewNote, _: Vec<f32>) -> Result<Note, IndexError> {
            Err(IndexError::backend("read-only"))
        }

        async fn get(&self, _: Uuid) -> Result<Option<Note>, IndexError> {
            Ok(None)
        }

        async fn update(
            &self,
            _: Uuid,
            _: NoteChanges,
            _: Option<Vec<f32>>,
        ) -> Result<Option<Note>, IndexError> {
            Ok(None)
        }

        async fn delete(&self, _: Uuid) -> Result<bool, IndexError> {
            Ok(false)
        }

        async fn list(&self, _: &ListQuery) -> Result<Vec<Note>, IndexError> {
            Ok(Vec::new())
        }
    }

    fn candidate(title: &str, v: f64, l: f64) -> ScoredCandidate {
        let now = chrono::Utc::now();
        ScoredCandidate {
            note: Note {
                id: Uuid::new_v4(),
                url: format!("https://example.com/{title}"),
                title: title.into(),
                description: String::new(),
                tags: Vec::new(),
                created_at: now,
                updated_at: now,
            },
            vector_similarity: v,
            lexical_similarity: l,
        }
    }

    fn titles(items: &[RetrievedItem]) -> Vec<&str> {
        items.iter().map(|i| i.note.title.as_str()).collect()
    }

    fn canned(candidates: Vec<ScoredCandidate>) -> Arc<CannedStore> {
        Arc::new(CannedStore {
            candidates,
            ..Default::default()
        })
    }

    #[test]
    fn weight_and_top_k_clamps() {
        assert_eq!(clamp_weight(1.5), 1.0);
        assert_eq!(clamp_weight(-0.2), 0.0);
        assert_eq!(clamp_weight(f64::NAN), 0.7);
        assert_eq!(clamp_top_k(None), 10);
        assert_eq!(clamp_top_k(Some(0)), 1);
        assert_eq!(clamp_top_k(Some(1000)), 200);
    }

    #[tokio::test]
    async fn blank_text_skips_store() {
        let store = canned(vec![candidate("a", 1.0, 1.0)]);
        let scorer = HybridScorer::new(store.clone());
        let out = scorer.search(&[1.0], "   \n", None, 0.7, None).await.unwrap();
        assert!(out.is_empty());
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn weight_one_ranks_by_vector_only() {
        let store = canned(vec![
            candidate("lexical", 0.1, 0.9),
            candidate("vector", 0.9, 0.1),
        ]);
        let scorer = HybridScorer::new(store);
        let out = scorer.search(&[1.0], "q", None, 1.0, None).await.unwrap();
        assert_eq!(titles(&out), vec!["vector", "lexical"]);
        assert!((out[0].score - 0.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn weight_zero_ranks_by_lexical_only() {
        let store = canned(vec![
            candidate("vector", 0.9, 0.1),
            candidate("lexical", 0.1, 0.9),
        ]);
        let scorer = HybridScorer::new(store);
        let out = scorer.search(&[1.0], "q", None, 0.0, None).await.unwrap();
        assert_eq!(titles(&out), vec!["lexical", "vector"]);
    }

    #[tokio::test]
    async fn out_of_range_weight_is_clamped_before_store() {
        let store = canned(vec![candidate("a", 0.5, 0.5)]);
        let scorer = HybridScorer::new(store.clone());
        scorer.search(&[1.0], "q", None, 3.0, None).await.unwrap();
        let q = store.last_query.lock().unwrap().clone().unwrap();
        assert_eq!(q.vector_weight, 1.0);
        assert_eq!(q.limit, 10);
    }

    #[tokio::test]
    async fn ties_keep_store_order() {
        let store = canned(vec![
            candidate("first", 0.5, 0.5),
            candidate("second", 0.5, 0.5),
            candidate("top", 1.0, 1.0),
        ]);
        let scorer = HybridScorer::new(store);
        let out = scorer.search(&[1.0], "q", None, 0.7, None).await.unwrap();
        assert_eq!(titles(&out), vec!["top", "first", "second"]);
    }

    #[tokio::test]
    async fn non_finite_signal_counts_as_zero() {
        let store = canned(vec![candidate("nan", f64::NAN, 0.5)]);
        let scorer = HybridScorer::new(store);
        let out = scorer.search(&[1.0], "q", None, 0.5, None).await.unwrap();
        assert!((out[0].score - 0.25).abs() < 1e-9);
    }

    #[tokio::test]
    async fn top_k_is_clamped() {
        let many: Vec<_> = (0..250).map(|i| candidate(&format!("n{i}"), 0.5, 0.5)).collect();
        let scorer = HybridScorer::new(canned(many));

        let out = scorer.search(&[1.0], "q", None, 0.7, Some(1000)).await.unwrap();
        assert_eq!(out.len(), 200);

        let out = scorer.search(&[1.0], "q", None, 0.7, Some(0)).await.unwrap();
        assert_eq!(out.len(), 1);
    }

    #[tokio::test]
    async fn blank_tags_are_dropped() {
        let store = canned(vec![]);
        let scorer = HybridScorer::new(store.clone());
        let tags = vec!["  ".to_string(), "rust".to_string()];
        scorer.search(&[1.0], "q", Some(&tags), 0.7, None).await.unwrap();
        let q = store.last_query.lock().unwrap().clone().unwrap();
        assert_eq!(q.tags, vec!["rust"]);
    }

    #[tokio::test]
    async fn store_error_propagates_once() {
        let store = Arc::new(CannedStore {
            fail: true,
            ..Default::default()
        });
        let scorer = HybridScorer::new(store.clone());
        let err = scorer.search(&[1.0], "q", None, 0.7, None).await.unwrap_err();
        assert!(matches!(err, IndexError::Backend(_)));
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn tag_filter_is_strict_and() {
        let store = Arc::new(InMemoryNoteStore::new());
        let fixtures = [
            ("alpha", vec!["rust", "db"]),
            ("beta", vec!["rust"]),
            ("gamma", vec!["db", "ops"]),
        ];
        for (title, tags) in fixtures {
            store
                .insert(
                    NewNote {
                        url: format!("https://example.com/{title}"),
                        title: title.into(),
                        description: "notes about systems".into(),
                        tags: tags.into_iter().map(String::from).collect(),
                    },
                    vec![1.0, 0.0],
                )
                .await
                .unwrap();
        }
        let scorer = HybridScorer::new(store);

        let rust_db = vec!["rust".to_string(), "db".to_string()];
        let out = scorer
            .search(&[1.0, 0.0], "systems", Some(&rust_db), 0.7, None)
            .await
            .unwrap();
        assert_eq!(titles(&out), vec!["alpha"]);

        let db = vec!["db".to_string()];
        let mut out = titles(
            &scorer
                .search(&[1.0, 0.0], "systems", Some(&db), 0.7, None)
                .await
                .unwrap(),
        )
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>();
        out.sort();
        assert_eq!(out, vec!["alpha", "gamma"]);

        let none = vec!["rust".to_string(), "ops".to_string()];
        assert!(scorer
            .search(&[1.0, 0.0], "systems", Some(&none), 0.7, None)
            .await
            .unwrap()
            .is_empty());
    }
}
