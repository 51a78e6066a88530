use async_stream::try_stream;
use futures::StreamExt;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::ChatProviderError;
use crate::openai::truncate;
use crate::provider::{failed_stream, ChatStreamProvider, TokenStream};
use crate::sse::{anthropic_frame, body_lines, classify_line, Frame, SseLine};
use crate::types::{ChatMessage, ChatRole};

const PROVIDER: &str = "anthropic";

/// Native Anthropic Messages API with `stream: true`.
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    client: reqwest::Client,
    endpoint: String,
    version: String,
    max_tokens: u32,
}

impl AnthropicProvider {
    pub fn new(client: reqwest::Client, base_url: &str, version: &str, max_tokens: u32) -> Self {
        Self {
            client,
            endpoint: format!("{}/v1/messages", base_url.trim_end_matches('/')),
            version: version.to_string(),
            max_tokens: max_tokens.max(1),
        }
    }
}

/// System turns go in the top-level `system` field; the rest keep their order.
pub(crate) fn request_body(model: &str, messages: &[ChatMessage], max_tokens: u32) -> Value {
    let system = messages
        .iter()
        .filter(|m| m.role == ChatRole::System)
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    let turns: Vec<Value> = messages
        .iter()
        .filter(|m| m.role != ChatRole::System)
        .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
        .collect();

    let mut body = json!({
        "model": model,
        "max_tokens": max_tokens,
        "messages": turns,
        "stream": true,
    });
    if !system.is_empty() {
        body["system"] = Value::String(system);
    }
    body
}

impl ChatStreamProvider for AnthropicProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn stream_tokens(
        &self,
        model: &str,
        messages: &[ChatMessage],
        credential: Option<&str>,
    ) -> TokenStream {
        let Some(key) = credential else {
            return failed_stream(ChatProviderError::MissingCredential(PROVIDER.into()));
        };

        let request = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", key)
            .header("anthropic-version", self.version.as_str())
            .json(&request_body(model, messages, self.max_tokens));

        try_stream! {
            let response = request
                .send()
                .await
                .map_err(|e| ChatProviderError::transport(PROVIDER, e))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                warn!(
                    provider = PROVIDER,
                    status = status.as_u16(),
                    "chat upstream rejected request"
                );
                Err(ChatProviderError::Http {
                    provider: PROVIDER.into(),
                    status: status.as_u16(),
                    message: truncate(&body, 500),
                })?;
            } else {
                let mut lines = body_lines(response);
                while let Some(line) = lines
                    .next_line()
                    .await
                    .map_err(|e| ChatProviderError::transport(PROVIDER, e))?
                {
                    let payload = match classify_line(&line) {
                        SseLine::Skip => continue,
                        SseLine::Done => break,
                        SseLine::Data(payload) => payload,
                    };
                    match anthropic_frame(payload) {
                        Some(Frame::Text(text)) => yield text,
                        Some(Frame::Stop) => break,
                        Some(Frame::Error(message)) => {
                            Err(ChatProviderError::Upstream {
                                provider: PROVIDER.into(),
                                message,
                            })?;
                        }
                        Some(Frame::Ignore) => {}
                        None => debug!(provider = PROVIDER, "skipping malformed stream frame"),
                    }
                }
            }
        }
        .boxed()
    }
}
