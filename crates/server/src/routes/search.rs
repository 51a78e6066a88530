use crate::error::ServerResult;
use crate::state::ServerState;
use axum::extract::State;
use axum::Json;
use index::RetrievedItem;
use rag::SearchRequest;
use std::sync::Arc;

/// Hybrid vector + trigram search over notes
///
/// # Request
///
/// ```json
/// { "query": "async runtime", "tags": ["rust"], "topK": 10, "hybridWeight": 0.7 }
/// ```
///
/// # Response
///
/// Ranked `[{ "note": {...}, "score": 0.83 }]`, best first.
pub async fn search_notes(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<SearchRequest>,
) -> ServerResult<Json<Vec<RetrievedItem>>> {
    let items = state.orchestrator.retriever().search(&request).await?;
    Ok(Json(items))
}
