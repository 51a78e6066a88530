//! HTTP-level tests driving the router in process with the in-memory store,
//! mock embeddings and the mock chat provider.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use index::{InMemoryNoteStore, Note};
use semantic::{Embedder, EmbeddingConfig};
use serde_json::{json, Value};
use server::{build_router, MetadataScraper, PageMetadata, ScrapeError, ServerConfig, ServerState};
use std::sync::Arc;
use tower::ServiceExt;

struct FixedScraper;

#[async_trait]
impl MetadataScraper for FixedScraper {
    async fn scrape(&self, _url: &str) -> Result<PageMetadata, ScrapeError> {
        Ok(PageMetadata {
            title: "Scraped title".into(),
            description: "Scraped description".into(),
        })
    }
}

struct BrokenScraper;

#[async_trait]
impl MetadataScraper for BrokenScraper {
    async fn scrape(&self, _url: &str) -> Result<PageMetadata, ScrapeError> {
        Err(ScrapeError::Status(503))
    }
}

struct TestApp {
    router: Router,
    store: Arc<InMemoryNoteStore>,
}

fn app_with(config: ServerConfig, scraper: Arc<dyn MetadataScraper>) -> TestApp {
    let store = Arc::new(InMemoryNoteStore::new());
    let embedder = Embedder::from_config(&EmbeddingConfig::mock()).unwrap();
    let state = ServerState::from_parts(config, store.clone(), embedder, scraper).unwrap();
    TestApp {
        router: build_router(Arc::new(state)),
        store,
    }
}

fn app() -> TestApp {
    let mut config = ServerConfig::offline();
    config.rate_limit.capacity = 1000;
    app_with(config, Arc::new(FixedScraper))
}

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, bytes.to_vec())
}

async fn send_json(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let (status, _, bytes) = send(router, method, uri, body).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create(router: &Router, body: Value) -> Note {
    let (status, value) = send_json(router, Method::POST, "/api/notes", Some(body)).await;
    assert_eq!(status, StatusCode::OK, "{value}");
    serde_json::from_value(value).unwrap()
}

/// `(event name, data)` per SSE block, comments skipped.
fn parse_sse(body: &[u8]) -> Vec<(Option<String>, String)> {
    let text = String::from_utf8_lossy(body);
    text.split("\n\n")
        .filter_map(|block| {
            let mut name = None;
            let mut data: Vec<&str> = Vec::new();
            for line in block.lines() {
                if let Some(rest) = line.strip_prefix("event:") {
                    name = Some(rest.trim().to_string());
                } else if let Some(rest) = line.strip_prefix("data:") {
                    data.push(rest.strip_prefix(' ').unwrap_or(rest));
                }
            }
            (name.is_some() || !data.is_empty()).then(|| (name, data.join("\n")))
        })
        .collect()
}

#[tokio::test]
async fn health_reports_ok_and_version() {
    let app = app();
    let (status, body) = send_json(&app.router, Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let app = app();
    let (status, body) = send_json(&app.router, Method::GET, "/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn metrics_without_recorder_is_404() {
    let app = app();
    let (status, _) = send_json(&app.router, Method::GET, "/metrics", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn notes_crud_round_trip() {
    let app = app();
    let note = create(
        &app.router,
        json!({
            "url": "https://tokio.rs",
            "title": "  Tokio  ",
            "description": "An asynchronous\nruntime",
            "tags": ["rust", " async ", ""]
        }),
    )
    .await;
    assert_eq!(note.title, "Tokio");
    assert_eq!(note.description, "An asynchronous runtime");
    assert_eq!(note.tags, vec!["rust", "async"]);
    let original_embedding = app.store.embedding(note.id).unwrap();
    assert_eq!(original_embedding.len(), 1024);

    create(
        &app.router,
        json!({
            "url": "https://docs.rs/axum",
            "title": "Axum",
            "description": "Web framework",
            "tags": ["rust"]
        }),
    )
    .await;

    let (status, listed) =
        send_json(&app.router, Method::GET, "/api/notes?tags=rust,async", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["title"], "Tokio");

    let (_, all) = send_json(&app.router, Method::GET, "/api/notes?limit=10", None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    // Tags only: embedding untouched.
    let uri = format!("/api/notes/{}", note.id);
    let (status, updated) =
        send_json(&app.router, Method::PUT, &uri, Some(json!({"tags": ["runtime"]}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["tags"], json!(["runtime"]));
    assert_eq!(app.store.embedding(note.id).unwrap(), original_embedding);

    // Title change: re-embedded.
    let (status, updated) =
        send_json(&app.router, Method::PUT, &uri, Some(json!({"title": "Tokio runtime"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Tokio runtime");
    assert_ne!(app.store.embedding(note.id).unwrap(), original_embedding);

    let (status, body) = send_json(&app.router, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));

    let (status, body) = send_json(&app.router, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = send_json(&app.router, Method::PUT, &uri, Some(json!({"title": "x"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_fields_are_scraped() {
    let app = app();
    let note = create(
        &app.router,
        json!({"url": "https://example.com/post", "title": "Mine"}),
    )
    .await;
    assert_eq!(note.title, "Mine");
    assert_eq!(note.description, "Scraped description");
}

#[tokio::test]
async fn scrape_failure_does_not_block_creation() {
    let mut config = ServerConfig::offline();
    config.rate_limit.capacity = 1000;
    let app = app_with(config, Arc::new(BrokenScraper));
    let note = create(&app.router, json!({"url": "https://example.com/post"})).await;
    assert_eq!(note.title, "");
    assert_eq!(note.description, "");
    assert_eq!(app.store.len(), 1);
}

#[tokio::test]
async fn invalid_input_is_400() {
    let app = app();
    let (status, body) =
        send_json(&app.router, Method::POST, "/api/notes", Some(json!({"url": "ftp://x"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, _) = send_json(&app.router, Method::GET, "/api/notes?limit=500", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/api/notes?offset={}", u64::MAX);
    let (status, body) = send_json(&app.router, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("offset"));

    let (status, _) = send_json(&app.router, Method::DELETE, "/api/notes/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_returns_ranked_notes() {
    let app = app();
    create(
        &app.router,
        json!({
            "url": "https://tokio.rs",
            "title": "Tokio",
            "description": "async runtime",
            "tags": ["rust"]
        }),
    )
    .await;
    create(
        &app.router,
        json!({
            "url": "https://asyncio.org",
            "title": "asyncio",
            "description": "python async",
            "tags": ["python"]
        }),
    )
    .await;

    let (status, hits) = send_json(
        &app.router,
        Method::POST,
        "/api/search",
        Some(json!({"query": "async runtime", "topK": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let hits = hits.as_array().unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits[0]["score"].as_f64().unwrap() >= hits[1]["score"].as_f64().unwrap());
    assert!(hits[0]["note"]["id"].is_string());

    let (_, filtered) = send_json(
        &app.router,
        Method::POST,
        "/api/search",
        Some(json!({"query": "async", "tags": ["python"]})),
    )
    .await;
    assert_eq!(filtered.as_array().unwrap().len(), 1);
    assert_eq!(filtered[0]["note"]["title"], "asyncio");

    let (_, empty) =
        send_json(&app.router, Method::POST, "/api/search", Some(json!({"query": "   "}))).await;
    assert_eq!(empty, json!([]));
}

#[tokio::test]
async fn chat_streams_tokens_then_done_with_citations() {
    let app = app();
    let note = create(
        &app.router,
        json!({"url": "https://tokio.rs", "title": "Tokio", "description": "async runtime"}),
    )
    .await;

    let (status, headers, body) = send(
        &app.router,
        Method::POST,
        "/api/chat",
        Some(json!({
            "messages": [{"role": "user", "content": "what is tokio?"}],
            "provider": "mock"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let events = parse_sse(&body);
    let tokens: String = events
        .iter()
        .filter(|(name, _)| name.is_none())
        .map(|(_, data)| data.as_str())
        .collect();
    assert_eq!(tokens, "Hello world!");

    let (name, data) = events.last().unwrap();
    assert_eq!(name.as_deref(), Some("done"));
    let done: Value = serde_json::from_str(data).unwrap();
    assert_eq!(
        done,
        json!({"citations": [{"id": note.id, "title": "Tokio", "url": "https://tokio.rs/"}]})
    );
    assert_eq!(events.iter().filter(|(n, _)| n.is_some()).count(), 1);
}

#[tokio::test]
async fn chat_with_unknown_provider_ends_in_error_event() {
    let app = app();
    let (status, _, body) = send(
        &app.router,
        Method::POST,
        "/api/chat",
        Some(json!({"messages": [{"role": "user", "content": "hi"}], "provider": "nonesuch"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let events = parse_sse(&body);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0.as_deref(), Some("error"));
    assert!(events[0].1.contains("nonesuch"));
}

#[tokio::test]
async fn rate_limit_rejects_with_retry_after_and_skips_unprotected_routes() {
    let mut config = ServerConfig::offline();
    config.rate_limit.capacity = 2;
    let app = app_with(config, Arc::new(FixedScraper));

    for _ in 0..2 {
        let (status, _) =
            send_json(&app.router, Method::POST, "/api/search", Some(json!({"query": "x"}))).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, headers, body) =
        send(&app.router, Method::POST, "/api/search", Some(json!({"query": "x"}))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(headers[header::RETRY_AFTER], "1");
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        body,
        json!({"error": {"code": "RATE_LIMIT_EXCEEDED", "message": "Rate limit exceeded"}})
    );

    // Same client, other protected prefix: shared bucket.
    let (status, _) = send_json(&app.router, Method::GET, "/api/notes", None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    let (status, _) = send_json(&app.router, Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn og_scrape_endpoint() {
    let app = app();
    let (status, body) =
        send_json(&app.router, Method::GET, "/api/og-scrape?url=https://example.com", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"title": "Scraped title", "description": "Scraped description"})
    );

    let mut config = ServerConfig::offline();
    config.rate_limit.capacity = 1000;
    let broken = app_with(config, Arc::new(BrokenScraper));
    let uri = "/api/og-scrape?url=https://example.com";
    let (status, body) = send_json(&broken.router, Method::GET, uri, None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "SCRAPE_ERROR");
}
