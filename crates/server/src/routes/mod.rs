//! API route handlers
//!
//! - `health`: liveness and Prometheus metrics
//! - `notes`: note CRUD with embedding and metadata enrichment
//! - `search`: hybrid search
//! - `chat`: retrieval-augmented chat over SSE
//! - `og`: Open Graph scraping

pub mod chat;
pub mod health;
pub mod notes;
pub mod og;
pub mod search;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "NoteNest",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/api/notes",
            "/api/search",
            "/api/chat",
            "/api/og-scrape",
            "/api/health",
            "/metrics"
        ]
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound("Route not found".to_string())
}
