use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::rate_limit::RateLimiter;
use crate::scrape::{HttpMetadataScraper, MetadataScraper};
use chat::ChatProviders;
use index::{HybridScorer, InMemoryNoteStore, NoteStore};
use metrics_exporter_prometheus::PrometheusHandle;
use rag::{RagChatOrchestrator, Retriever};
use semantic::{Embedder, EmbeddingConfig, EmbeddingError};
use std::sync::Arc;
use std::time::Duration;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Per-client token buckets
    pub rate_limiter: Arc<RateLimiter>,

    /// Note storage (shared across requests)
    pub store: Arc<dyn NoteStore>,

    /// Text to unit-length vectors
    pub embedder: Embedder,

    /// Retrieval plus streamed chat
    pub orchestrator: RagChatOrchestrator,

    /// Open Graph lookup for notes created without a title or description
    pub scraper: Arc<dyn MetadataScraper>,

    /// Prometheus render handle, when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl ServerState {
    /// Build every collaborator from configuration.
    ///
    /// A `database_url` selects PostgreSQL (schema created if missing);
    /// otherwise notes live in memory.
    pub async fn new(config: ServerConfig) -> ServerResult<Self> {
        let embedder = build_embedder(&config.embedding)?;
        let store = build_store(&config, embedder.dimension()).await?;
        let scraper = HttpMetadataScraper::new(Duration::from_secs(config.scrape_timeout_secs))
            .map_err(|e| ServerError::Config(format!("scraper http client: {e}")))?;
        Self::from_parts(config, store, embedder, Arc::new(scraper))
    }

    /// Assemble state around collaborators the caller already built.
    pub fn from_parts(
        config: ServerConfig,
        store: Arc<dyn NoteStore>,
        embedder: Embedder,
        scraper: Arc<dyn MetadataScraper>,
    ) -> ServerResult<Self> {
        let providers = ChatProviders::from_config(config.chat.providers.clone())?;
        let retriever = Retriever::new(embedder.clone(), HybridScorer::new(store.clone()));
        let orchestrator = RagChatOrchestrator::new(retriever, providers, config.chat.clone());

        Ok(Self {
            rate_limiter: Arc::new(RateLimiter::new(config.rate_limit.clone())),
            config: Arc::new(config),
            store,
            embedder,
            orchestrator,
            scraper,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// A remote provider without a key falls back to the offline embedder so a
/// fresh checkout runs without secrets.
fn build_embedder(config: &EmbeddingConfig) -> ServerResult<Embedder> {
    match Embedder::from_config(config) {
        Ok(embedder) => Ok(embedder),
        Err(EmbeddingError::MissingCredential(provider)) => {
            tracing::warn!(
                provider = %provider,
                "no embedding API key configured, using mock embeddings"
            );
            let fallback = EmbeddingConfig {
                embedding_dimension: config.embedding_dimension,
                retry: config.retry,
                ..EmbeddingConfig::mock()
            };
            Ok(Embedder::from_config(&fallback)?)
        }
        Err(err) => Err(ServerError::Config(err.to_string())),
    }
}

async fn build_store(config: &ServerConfig, dimension: usize) -> ServerResult<Arc<dyn NoteStore>> {
    match config.database_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        #[cfg(feature = "postgres")]
        Some(url) => {
            let store = index::PgNoteStore::connect(url, config.db_max_connections).await?;
            store.ensure_schema(dimension).await?;
            tracing::info!(dimension, "connected to PostgreSQL note store");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "postgres"))]
        Some(_) => {
            let _ = dimension;
            tracing::warn!(
                "database_url is set but the postgres feature is disabled, keeping notes in memory"
            );
            Ok(Arc::new(InMemoryNoteStore::new()))
        }
        None => {
            let _ = dimension;
            tracing::warn!("no database_url configured, keeping notes in memory");
            Ok(Arc::new(InMemoryNoteStore::new()))
        }
    }
}

/// Server metadata for health checks
#[derive(Debug, serde::Serialize)]
pub struct ServerMetadata {
    pub ok: bool,
    pub version: String,
    pub uptime_seconds: u64,
}
