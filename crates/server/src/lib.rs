//! NoteNest Server - HTTP API for notes, hybrid search and cited chat
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `GET /api/health` - liveness and version
//! - `GET /metrics` - Prometheus metrics
//! - `POST /api/notes`, `GET /api/notes` - create and list notes
//! - `PUT /api/notes/{id}`, `DELETE /api/notes/{id}` - update and delete
//! - `POST /api/search` - hybrid vector + trigram search
//! - `POST /api/chat` - retrieval-augmented chat streamed as SSE
//! - `GET /api/og-scrape?url=` - Open Graph title and description
//!
//! Notes, search and chat are rate limited per client IP (HTTP 429 with
//! `Retry-After`).

pub mod config;
pub mod error;
pub mod middleware;
pub mod rate_limit;
pub mod routes;
pub mod scrape;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use rate_limit::{RateLimitConfig, RateLimited, RateLimiter};
pub use scrape::{HttpMetadataScraper, MetadataScraper, PageMetadata, ScrapeError};
pub use server::{build_router, start_server};
pub use state::ServerState;
