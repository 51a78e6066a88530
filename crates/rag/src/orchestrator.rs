use chat::{latest_user_message, ChatProviderKind, ChatProviders, TokenStream};
use futures::StreamExt;
use index::DEFAULT_HYBRID_WEIGHT;
use metrics::counter;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, trace, warn};

use crate::context::{build_prompt, render_context};
use crate::error::RagError;
use crate::retriever::Retriever;
use crate::settings::ChatSettings;
use crate::types::{ChatEvent, ChatRequest, Citation};

/// Outward event stream of one chat request.
pub type ChatEventStream = ReceiverStream<ChatEvent>;

/// Lifecycle of one chat request, traced as it advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Retrieving,
    Streaming,
    Finalizing,
    Done,
    Errored,
}

fn enter(phase: Phase) {
    trace!(?phase, "chat phase");
}

/// Retrieval-augmented chat: ground the conversation in the caller's notes,
/// stream the model's answer, then report which notes were cited.
#[derive(Debug, Clone)]
pub struct RagChatOrchestrator {
    retriever: Retriever,
    providers: ChatProviders,
    settings: ChatSettings,
}

impl RagChatOrchestrator {
    pub fn new(retriever: Retriever, providers: ChatProviders, settings: ChatSettings) -> Self {
        Self {
            retriever,
            providers,
            settings,
        }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    /// Run retrieval, then hand back the event stream.
    ///
    /// Embedding and retrieval failures are returned here, before any event
    /// exists. Everything after that, including an unsupported provider,
    /// arrives on the stream as its terminal event.
    pub async fn start(&self, request: ChatRequest) -> Result<ChatEventStream, RagError> {
        let ChatRequest {
            messages,
            tags,
            top_k,
            provider,
            model,
            api_key,
        } = request;

        enter(Phase::Idle);
        let query = latest_user_message(&messages)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        enter(Phase::Retrieving);
        let items = self
            .retriever
            .retrieve(
                query,
                tags.as_deref(),
                DEFAULT_HYBRID_WEIGHT,
                Some(top_k.unwrap_or(self.settings.top_k)),
            )
            .await?;

        let (context, citations) = render_context(&items);
        let prompt = build_prompt(&context, messages);

        let provider =
            non_blank(provider).unwrap_or_else(|| self.settings.default_provider.clone());
        let model = non_blank(model).unwrap_or_else(|| self.settings.default_model.clone());
        let label = provider
            .parse::<ChatProviderKind>()
            .map(ChatProviderKind::as_str)
            .unwrap_or("unsupported");
        counter!("notenest_chat_streams_total", "provider" => label).increment(1);
        debug!(
            provider = %provider,
            model = %model,
            citations = citations.len(),
            "starting chat stream"
        );

        let tokens = self
            .providers
            .stream_tokens(&provider, &model, &prompt, api_key.as_deref());

        let (tx, rx) = mpsc::channel(self.settings.channel_capacity.max(1));
        tokio::spawn(relay(tokens, tx, citations, label));
        Ok(ReceiverStream::new(rx))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Forward fragments until the provider finishes, fails, or the client goes
/// away. Exactly one terminal event is sent unless the client is gone.
async fn relay(
    mut tokens: TokenStream,
    tx: mpsc::Sender<ChatEvent>,
    citations: Vec<Citation>,
    provider: &'static str,
) {
    enter(Phase::Streaming);
    let mut fragments: u64 = 0;
    loop {
        let next = tokio::select! {
            biased;
            _ = tx.closed() => {
                debug!(provider, fragments, "client disconnected, abandoning upstream");
                break;
            }
            next = tokens.next() => next,
        };

        match next {
            Some(Ok(fragment)) => {
                fragments += 1;
                if tx.send(ChatEvent::Token(fragment)).await.is_err() {
                    debug!(provider, fragments, "client disconnected, abandoning upstream");
                    break;
                }
            }
            Some(Err(err)) => {
                enter(Phase::Errored);
                warn!(provider, error = %err, "chat provider failed mid-stream");
                let _ = tx.send(ChatEvent::Error(err.to_string())).await;
                break;
            }
            None => {
                enter(Phase::Finalizing);
                let _ = tx.send(ChatEvent::Done { citations }).await;
                enter(Phase::Done);
                break;
            }
        }
    }
    counter!("notenest_chat_fragments_total", "provider" => provider).increment(fragments);
}
