use index::{HybridScorer, RetrievedItem, DEFAULT_HYBRID_WEIGHT};
use metrics::counter;
use semantic::{clean_text, Embedder, MAX_QUERY_CHARS};
use tracing::debug;

use crate::error::RagError;
use crate::types::SearchRequest;

/// Query text in, ranked notes out: clean, embed, then hybrid-score.
#[derive(Debug, Clone)]
pub struct Retriever {
    embedder: Embedder,
    scorer: HybridScorer,
}

impl Retriever {
    pub fn new(embedder: Embedder, scorer: HybridScorer) -> Self {
        Self { embedder, scorer }
    }

    pub fn embedder(&self) -> &Embedder {
        &self.embedder
    }

    pub fn scorer(&self) -> &HybridScorer {
        &self.scorer
    }

    /// Rank notes for `query`. A query that is blank after cleaning returns
    /// nothing and skips the embedding call.
    pub async fn retrieve(
        &self,
        query: &str,
        tags: Option<&[String]>,
        weight: f64,
        top_k: Option<usize>,
    ) -> Result<Vec<RetrievedItem>, RagError> {
        let query = clean_text(query, MAX_QUERY_CHARS);
        if query.is_empty() {
            debug!("blank query, skipping retrieval");
            return Ok(Vec::new());
        }
        let vector = self.embedder.embed(&query).await?;
        let items = self.scorer.search(&vector, &query, tags, weight, top_k).await?;
        debug!(hits = items.len(), "retrieved notes");
        Ok(items)
    }

    /// `POST /api/search` semantics: weight defaults to 0.7, `top_k` to 10.
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<RetrievedItem>, RagError> {
        counter!("notenest_search_requests_total").increment(1);
        self.retrieve(
            &request.query,
            request.tags.as_deref(),
            request.hybrid_weight.unwrap_or(DEFAULT_HYBRID_WEIGHT),
            request.top_k,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use index::{InMemoryNoteStore, NewNote, NoteStore};
    use semantic::{EmbeddingConfig, MockEmbeddingProvider, RetryConfig};
    use std::sync::Arc;

    async fn seeded() -> (Retriever, Arc<InMemoryNoteStore>) {
        let embedder = Embedder::from_config(&EmbeddingConfig::mock()).unwrap();
        let store = Arc::new(InMemoryNoteStore::new());
        for (title, tags) in [
            ("Rust async book", vec!["rust", "async"]),
            ("Tokio tutorial", vec!["rust"]),
            ("Python asyncio", vec!["python", "async"]),
        ] {
            let vector = embedder.embed(title).await.unwrap();
            store
                .insert(
                    NewNote {
                        url: format!("https://example.com/{}", title.len()),
                        title: title.into(),
                        description: String::new(),
                        tags: tags.into_iter().map(String::from).collect(),
                    },
                    vector,
                )
                .await
                .unwrap();
        }
        (Retriever::new(embedder, HybridScorer::new(store.clone())), store)
    }

    #[tokio::test]
    async fn blank_query_returns_nothing() {
        let (retriever, _) = seeded().await;
        let hits = retriever.retrieve(" \n\t ", None, 0.7, None).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn exact_title_ranks_first_on_pure_vector_weight() {
        let (retriever, _) = seeded().await;
        let hits = retriever
            .retrieve("Tokio tutorial", None, 1.0, Some(3))
            .await
            .unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].note.title, "Tokio tutorial");
    }

    #[tokio::test]
    async fn search_applies_tag_filter() {
        let (retriever, _) = seeded().await;
        let hits = retriever
            .search(&SearchRequest {
                query: "async".into(),
                tags: Some(vec!["async".into(), "rust".into()]),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].note.title, "Rust async book");
    }

    #[tokio::test]
    async fn empty_store_yields_no_hits() {
        let embedder = Embedder::new(Arc::new(MockEmbeddingProvider), 8, RetryConfig::default());
        let store = Arc::new(InMemoryNoteStore::new());
        let retriever = Retriever::new(embedder, HybridScorer::new(store));
        assert!(retriever.retrieve("x", None, 0.5, None).await.unwrap().is_empty());
        assert_eq!(retriever.embedder().dimension(), 8);
    }
}
