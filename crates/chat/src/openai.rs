use async_stream::try_stream;
use futures::StreamExt;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::ChatProviderError;
use crate::provider::{failed_stream, ChatStreamProvider, TokenStream};
use crate::sse::{body_lines, classify_line, openai_frame, Frame, SseLine};
use crate::types::ChatMessage;

const MAX_ERROR_BODY_CHARS: usize = 500;

/// Any upstream speaking the OpenAI chat-completions streaming dialect
/// (OpenAI itself, Groq, OpenRouter).
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    name: String,
    client: reqwest::Client,
    endpoint: String,
    extra_headers: Vec<(String, String)>,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        name: impl Into<String>,
        client: reqwest::Client,
        base_url: &str,
        extra_headers: Vec<(String, String)>,
    ) -> Self {
        Self {
            name: name.into(),
            client,
            endpoint: format!("{}/v1/chat/completions", base_url.trim_end_matches('/')),
            extra_headers,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ChatStreamProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn stream_tokens(
        &self,
        model: &str,
        messages: &[ChatMessage],
        credential: Option<&str>,
    ) -> TokenStream {
        let Some(key) = credential.map(str::to_string) else {
            return failed_stream(ChatProviderError::MissingCredential(self.name.clone()));
        };

        let name = self.name.clone();
        let mut request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(key)
            .json(&json!({
                "model": model,
                "messages": messages,
                "stream": true,
            }));
        for (header, value) in &self.extra_headers {
            request = request.header(header.as_str(), value.as_str());
        }

        try_stream! {
            let response = request
                .send()
                .await
                .map_err(|e| ChatProviderError::transport(&name, e))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                warn!(provider = %name, status = status.as_u16(), "chat upstream rejected request");
                Err(ChatProviderError::Http {
                    provider: name.clone(),
                    status: status.as_u16(),
                    message: truncate(&body, MAX_ERROR_BODY_CHARS),
                })?;
            } else {
                let mut lines = body_lines(response);
                while let Some(line) = lines
                    .next_line()
                    .await
                    .map_err(|e| ChatProviderError::transport(&name, e))?
                {
                    let payload = match classify_line(&line) {
                        SseLine::Skip => continue,
                        SseLine::Done => break,
                        SseLine::Data(payload) => payload,
                    };
                    match openai_frame(payload) {
                        Some(Frame::Text(text)) => yield text,
                        Some(Frame::Stop) => break,
                        Some(Frame::Error(message)) => {
                            Err(ChatProviderError::Upstream { provider: name.clone(), message })?;
                        }
                        Some(Frame::Ignore) => {}
                        None => debug!(provider = %name, "skipping malformed stream frame"),
                    }
                }
            }
        }
        .boxed()
    }
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
