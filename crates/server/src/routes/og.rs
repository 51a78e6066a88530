use crate::error::{ServerError, ServerResult};
use crate::routes::notes::validate_url;
use crate::scrape::PageMetadata;
use crate::state::ServerState;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct OgScrapeParams {
    pub url: String,
}

/// Open Graph title and description of a page
pub async fn og_scrape(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<OgScrapeParams>,
) -> ServerResult<Json<PageMetadata>> {
    let url = validate_url(&params.url)?;
    let page = state
        .scraper
        .scrape(&url)
        .await
        .map_err(|e| ServerError::Scrape(e.to_string()))?;
    Ok(Json(page))
}
