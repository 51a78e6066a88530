use chat::ChatMessage;
use index::Note;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Numbered reference to a note that was placed in the model's context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub id: Uuid,
    pub title: String,
    pub url: String,
}

impl From<&Note> for Citation {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id,
            title: note.title.clone(),
            url: note.url.clone(),
        }
    }
}

/// One outward event of a chat stream.
///
/// A stream is any number of `Token`s followed by exactly one `Error` or
/// `Done`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Token(String),
    Error(String),
    Done { citations: Vec<Citation> },
}

#[derive(Serialize)]
struct DonePayload<'a> {
    citations: &'a [Citation],
}

impl ChatEvent {
    /// SSE event name; tokens go out as unnamed events.
    pub fn event_name(&self) -> Option<&'static str> {
        match self {
            ChatEvent::Token(_) => None,
            ChatEvent::Error(_) => Some("error"),
            ChatEvent::Done { .. } => Some("done"),
        }
    }

    /// SSE data field.
    pub fn data(&self) -> String {
        match self {
            ChatEvent::Token(text) | ChatEvent::Error(text) => text.clone(),
            ChatEvent::Done { citations } => serde_json::to_string(&DonePayload { citations })
                .unwrap_or_else(|_| r#"{"citations":[]}"#.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChatEvent::Token(_))
    }
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

/// Body of `POST /api/search`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub hybrid_weight: Option<f64>,
}
