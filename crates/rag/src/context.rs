use chat::ChatMessage;
use index::RetrievedItem;

use crate::types::Citation;

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant. Use the provided notes as context. \
Cite sources inline using [n] where n is the citation number. If the answer is unknown, say so.";

pub const CONTEXT_PREFIX: &str =
    "Context notes (use them to answer and include citation numbers):\n";

pub const NO_CONTEXT_NOTICE: &str = "No context available. Answer from general knowledge.";

/// Render retrieved notes as `[n] title\ndescription\nSource: url` blocks,
/// numbered from 1 and separated by blank lines, with the matching citations
/// in the same order.
pub fn render_context(items: &[RetrievedItem]) -> (String, Vec<Citation>) {
    let mut blocks = Vec::with_capacity(items.len());
    let mut citations = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let note = &item.note;
        blocks.push(format!(
            "[{}] {}\n{}\nSource: {}",
            idx + 1,
            note.title,
            note.description,
            note.url
        ));
        citations.push(Citation::from(note));
    }
    (blocks.join("\n\n"), citations)
}

/// Instruction, context, then the caller's conversation unchanged.
pub fn build_prompt(context: &str, conversation: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let context_message = if context.is_empty() {
        NO_CONTEXT_NOTICE.to_string()
    } else {
        format!("{CONTEXT_PREFIX}{context}")
    };
    let mut prompt = Vec::with_capacity(conversation.len() + 2);
    prompt.push(ChatMessage::system(SYSTEM_PROMPT));
    prompt.push(ChatMessage::system(context_message));
    prompt.extend(conversation);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use index::Note;
    use uuid::Uuid;

    fn item(title: &str, description: &str, url: &str) -> RetrievedItem {
        RetrievedItem {
            note: Note {
                id: Uuid::new_v4(),
                url: url.into(),
                title: title.into(),
                description: description.into(),
                tags: vec![],
                created_at: Default::default(),
                updated_at: Default::default(),
            },
            score: 0.5,
        }
    }

    #[test]
    fn numbers_blocks_from_one() {
        let items = vec![
            item("Tokio", "async runtime", "https://tokio.rs"),
            item("Axum", "web framework", "https://docs.rs/axum"),
        ];
        let (context, citations) = render_context(&items);
        assert_eq!(
            context,
            "[1] Tokio\nasync runtime\nSource: https://tokio.rs\n\n\
             [2] Axum\nweb framework\nSource: https://docs.rs/axum"
        );
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].title, "Tokio");
        assert_eq!(citations[1].url, "https://docs.rs/axum");
        assert_eq!(citations[1].id, items[1].note.id);
    }

    #[test]
    fn empty_retrieval_renders_nothing() {
        let (context, citations) = render_context(&[]);
        assert!(context.is_empty());
        assert!(citations.is_empty());
    }

    #[test]
    fn prompt_prepends_two_system_messages() {
        let prompt = build_prompt("[1] A", vec![ChatMessage::user("q")]);
        assert_eq!(prompt.len(), 3);
        assert_eq!(prompt[0].content, SYSTEM_PROMPT);
        assert_eq!(prompt[1].content, format!("{CONTEXT_PREFIX}[1] A"));
        assert_eq!(prompt[2], ChatMessage::user("q"));

        let bare = build_prompt("", vec![]);
        assert_eq!(bare[1].content, NO_CONTEXT_NOTICE);
    }
}
