use futures::stream::{self, StreamExt};

use crate::provider::{ChatStreamProvider, TokenStream};
use crate::types::ChatMessage;

/// Offline provider that replays a fixed script. Needs no credential.
#[derive(Debug, Clone)]
pub struct MockChatProvider {
    script: Vec<String>,
}

impl Default for MockChatProvider {
    fn default() -> Self {
        Self::with_script(["Hello", " ", "world", "!"])
    }
}

impl MockChatProvider {
    pub fn with_script<I, S>(script: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: script.into_iter().map(Into::into).collect(),
        }
    }
}

impl ChatStreamProvider for MockChatProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn stream_tokens(
        &self,
        _model: &str,
        _messages: &[ChatMessage],
        _credential: Option<&str>,
    ) -> TokenStream {
        stream::iter(self.script.clone().into_iter().map(Ok)).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn custom_script_is_replayed_in_order() {
        let p = MockChatProvider::with_script(["a", "b"]);
        let out: Vec<String> = p.stream_tokens("m", &[], None).try_collect().await.unwrap();
        assert_eq!(out, vec!["a", "b"]);
    }
}
