use crate::error::ServerResult;
use crate::state::ServerState;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::{Stream, StreamExt};
use rag::{ChatEvent, ChatRequest};
use std::convert::Infallible;
use std::sync::Arc;

/// Retrieval-augmented chat streamed as server-sent events
///
/// Unnamed events carry raw text fragments. The stream ends with exactly one
/// named event: `error` (message text) or `done`
/// (`{"citations":[{id,title,url}]}`).
pub async fn chat(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<ChatRequest>,
) -> ServerResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let events = state.orchestrator.start(request).await?;
    let stream = events.map(|event| Ok::<_, Infallible>(to_sse(&event)));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn to_sse(event: &ChatEvent) -> Event {
    let sse = Event::default().data(event.data());
    match event.event_name() {
        Some(name) => sse.event(name),
        None => sse,
    }
}
