use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use index::{
    ListQuery, NewNote, Note, NoteChanges, DEFAULT_LIST_LIMIT, MAX_LIST_OFFSET, MAX_RESULT_LIMIT,
};
use semantic::{clean_text, MAX_QUERY_CHARS};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

pub const TITLE_MAX_CHARS: usize = 4000;
pub const DESCRIPTION_MAX_CHARS: usize = 8000;

/// Body of `POST /api/notes`. Missing title or description is looked up
/// from the page's Open Graph tags.
#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Body of `PUT /api/notes/{id}`. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateNoteRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Query string of `GET /api/notes`.
#[derive(Debug, Default, Deserialize)]
pub struct ListNotesParams {
    /// Comma-separated, AND semantics.
    #[serde(default)]
    pub tags: Option<String>,
    /// Fuzzy keyword over title and description.
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

/// Accept absolute http(s) URLs only.
pub(crate) fn validate_url(raw: &str) -> ServerResult<String> {
    let parsed = reqwest::Url::parse(raw.trim())
        .map_err(|e| ServerError::BadRequest(format!("Invalid URL '{raw}': {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ServerError::BadRequest(format!(
            "Invalid URL '{raw}': expected an http or https address"
        )));
    }
    Ok(parsed.to_string())
}

fn parse_id(raw: &str) -> ServerResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ServerError::BadRequest(format!("Invalid note id '{raw}'")))
}

fn note_not_found(id: Uuid) -> ServerError {
    ServerError::NotFound(format!("Note {id} not found"))
}

fn embedding_text(title: &str, description: &str) -> String {
    clean_text(&format!("{title}\n\n{description}"), MAX_QUERY_CHARS)
}

/// Create a note
pub async fn create_note(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<CreateNoteRequest>,
) -> ServerResult<Json<Note>> {
    let url = validate_url(&request.url)?;
    let mut title = clean_text(request.title.as_deref().unwrap_or_default(), TITLE_MAX_CHARS);
    let mut description = clean_text(
        request.description.as_deref().unwrap_or_default(),
        DESCRIPTION_MAX_CHARS,
    );

    if title.is_empty() || description.is_empty() {
        match state.scraper.scrape(&url).await {
            Ok(page) => {
                if title.is_empty() {
                    title = clean_text(&page.title, TITLE_MAX_CHARS);
                }
                if description.is_empty() {
                    description = clean_text(&page.description, DESCRIPTION_MAX_CHARS);
                }
            }
            Err(err) => {
                tracing::warn!(
                    url = %url,
                    error = %err,
                    "metadata enrichment failed, keeping submitted fields"
                );
            }
        }
    }

    let vector = state.embedder.embed(&embedding_text(&title, &description)).await?;
    let note = state
        .store
        .insert(
            NewNote {
                url,
                title,
                description,
                tags: request.tags,
            },
            vector,
        )
        .await?;

    tracing::info!(note_id = %note.id, "note created");
    Ok(Json(note))
}

/// List notes, optionally filtered by tags and a keyword
pub async fn list_notes(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<ListNotesParams>,
) -> ServerResult<impl IntoResponse> {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    if !(1..=MAX_RESULT_LIMIT).contains(&limit) {
        return Err(ServerError::BadRequest(format!(
            "limit must be between 1 and {MAX_RESULT_LIMIT}"
        )));
    }
    let offset = params.offset.unwrap_or(0);
    if offset > MAX_LIST_OFFSET {
        return Err(ServerError::BadRequest(format!(
            "offset must be at most {MAX_LIST_OFFSET}"
        )));
    }

    let tags = params
        .tags
        .as_deref()
        .map(|raw| raw.split(',').map(str::to_string).collect())
        .unwrap_or_default();

    let query = ListQuery {
        tags,
        keyword: params.q,
        limit,
        offset,
    };
    Ok(Json(state.store.list(&query).await?))
}

/// Partially update a note, re-embedding only when its text changes
pub async fn update_note(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    Json(request): Json<UpdateNoteRequest>,
) -> ServerResult<Json<Note>> {
    let id = parse_id(&id)?;
    let current = state.store.get(id).await?.ok_or_else(|| note_not_found(id))?;

    let changes = NoteChanges {
        url: request.url.as_deref().map(validate_url).transpose()?,
        title: request.title.map(|t| clean_text(&t, TITLE_MAX_CHARS)),
        description: request
            .description
            .map(|d| clean_text(&d, DESCRIPTION_MAX_CHARS)),
        tags: request.tags,
    };

    let embedding = if changes.changes_text_of(&current) {
        let title = changes.title.as_deref().unwrap_or(&current.title);
        let description = changes.description.as_deref().unwrap_or(&current.description);
        Some(state.embedder.embed(&embedding_text(title, description)).await?)
    } else {
        None
    };

    let note = state
        .store
        .update(id, changes, embedding)
        .await?
        .ok_or_else(|| note_not_found(id))?;
    Ok(Json(note))
}

/// Delete a note
pub async fn delete_note(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> ServerResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    if !state.store.delete(id).await? {
        return Err(note_not_found(id));
    }
    Ok(Json(json!({ "ok": true })))
}
