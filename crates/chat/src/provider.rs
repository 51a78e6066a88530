use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::anthropic::AnthropicProvider;
use crate::error::ChatProviderError;
use crate::mock::MockChatProvider;
use crate::openai::OpenAiCompatibleProvider;
use crate::types::ChatMessage;

/// Lazy, finite, non-restartable sequence of text fragments. Ends at the
/// first error.
pub type TokenStream = BoxStream<'static, Result<String, ChatProviderError>>;

/// One upstream generation backend.
///
/// Implementations translate their native streaming wire format into plain
/// text fragments. Nothing happens on the network until the returned stream
/// is polled.
pub trait ChatStreamProvider: Send + Sync {
    fn name(&self) -> &str;

    fn stream_tokens(
        &self,
        model: &str,
        messages: &[ChatMessage],
        credential: Option<&str>,
    ) -> TokenStream;
}

/// A stream that fails with `err` on first poll.
pub(crate) fn failed_stream(err: ChatProviderError) -> TokenStream {
    stream::once(async move { Err(err) }).boxed()
}

/// The closed set of supported upstreams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatProviderKind {
    Groq,
    OpenAi,
    OpenRouter,
    Anthropic,
    Mock,
}

impl ChatProviderKind {
    pub const ALL: [ChatProviderKind; 5] = [
        ChatProviderKind::Groq,
        ChatProviderKind::OpenAi,
        ChatProviderKind::OpenRouter,
        ChatProviderKind::Anthropic,
        ChatProviderKind::Mock,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChatProviderKind::Groq => "groq",
            ChatProviderKind::OpenAi => "openai",
            ChatProviderKind::OpenRouter => "openrouter",
            ChatProviderKind::Anthropic => "anthropic",
            ChatProviderKind::Mock => "mock",
        }
    }

    pub fn requires_credential(self) -> bool {
        !matches!(self, ChatProviderKind::Mock)
    }
}

impl fmt::Display for ChatProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatProviderKind {
    type Err = ChatProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        ChatProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == key)
            .ok_or_else(|| ChatProviderError::UnsupportedProvider(s.trim().to_string()))
    }
}

/// Endpoints and server-held credentials for every upstream.
///
/// Loaded as part of the server's `chat` config section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChatProvidersConfig {
    #[serde(skip_serializing)]
    pub groq_api_key: Option<String>,
    pub groq_base_url: String,
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    #[serde(skip_serializing)]
    pub openrouter_api_key: Option<String>,
    pub openrouter_base_url: String,
    /// Sent as `HTTP-Referer` for OpenRouter attribution.
    pub openrouter_referer: String,
    /// Sent as `X-Title` for OpenRouter attribution.
    pub openrouter_title: String,
    #[serde(skip_serializing)]
    pub anthropic_api_key: Option<String>,
    pub anthropic_base_url: String,
    pub anthropic_version: String,
    /// Anthropic requires an explicit output cap.
    pub anthropic_max_tokens: u32,
    /// Longest silence between upstream reads, in seconds. Long answers keep
    /// streaming as long as bytes keep arriving.
    pub timeout_secs: u64,
}

impl Default for ChatProvidersConfig {
    fn default() -> Self {
        Self {
            groq_api_key: None,
            groq_base_url: "https://api.groq.com/openai".into(),
            openai_api_key: None,
            openai_base_url: "https://api.openai.com".into(),
            openrouter_api_key: None,
            openrouter_base_url: "https://openrouter.ai/api".into(),
            openrouter_referer: "http://localhost:5173".into(),
            openrouter_title: "NoteNest".into(),
            anthropic_api_key: None,
            anthropic_base_url: "https://api.anthropic.com".into(),
            anthropic_version: "2023-06-01".into(),
            anthropic_max_tokens: 1024,
            timeout_secs: 120,
        }
    }
}

impl ChatProvidersConfig {
    /// Server-held key for `kind`, ignoring blank values.
    pub fn server_credential(&self, kind: ChatProviderKind) -> Option<&str> {
        let key = match kind {
            ChatProviderKind::Groq => self.groq_api_key.as_deref(),
            ChatProviderKind::OpenAi => self.openai_api_key.as_deref(),
            ChatProviderKind::OpenRouter => self.openrouter_api_key.as_deref(),
            ChatProviderKind::Anthropic => self.anthropic_api_key.as_deref(),
            ChatProviderKind::Mock => None,
        };
        key.map(str::trim).filter(|k| !k.is_empty())
    }
}

/// Registry of provider variants plus the server-held credentials.
#[derive(Clone)]
pub struct ChatProviders {
    providers: HashMap<ChatProviderKind, Arc<dyn ChatStreamProvider>>,
    config: ChatProvidersConfig,
}

impl fmt::Debug for ChatProviders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.providers.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        f.debug_struct("ChatProviders").field("providers", &kinds).finish()
    }
}

impl ChatProviders {
    /// Build every variant, sharing one HTTP client.
    pub fn from_config(config: ChatProvidersConfig) -> Result<Self, ChatProviderError> {
        let client = reqwest::Client::builder()
            .read_timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ChatProviderError::InvalidConfig(format!("http client: {e}")))?;

        let mut providers: HashMap<ChatProviderKind, Arc<dyn ChatStreamProvider>> = HashMap::new();
        providers.insert(
            ChatProviderKind::Groq,
            Arc::new(OpenAiCompatibleProvider::new(
                "groq",
                client.clone(),
                &config.groq_base_url,
                Vec::new(),
            )),
        );
        providers.insert(
            ChatProviderKind::OpenAi,
            Arc::new(OpenAiCompatibleProvider::new(
                "openai",
                client.clone(),
                &config.openai_base_url,
                Vec::new(),
            )),
        );
        providers.insert(
            ChatProviderKind::OpenRouter,
            Arc::new(OpenAiCompatibleProvider::new(
                "openrouter",
                client.clone(),
                &config.openrouter_base_url,
                vec![
                    ("HTTP-Referer".to_string(), config.openrouter_referer.clone()),
                    ("X-Title".to_string(), config.openrouter_title.clone()),
                ],
            )),
        );
        providers.insert(
            ChatProviderKind::Anthropic,
            Arc::new(AnthropicProvider::new(
                client,
                &config.anthropic_base_url,
                &config.anthropic_version,
                config.anthropic_max_tokens,
            )),
        );
        providers.insert(ChatProviderKind::Mock, Arc::new(MockChatProvider::default()));

        Ok(Self { providers, config })
    }

    /// Swap in a different implementation for one kind (tests, custom gateways).
    pub fn with_provider(
        mut self,
        kind: ChatProviderKind,
        provider: Arc<dyn ChatStreamProvider>,
    ) -> Self {
        self.providers.insert(kind, provider);
        self
    }

    pub fn config(&self) -> &ChatProvidersConfig {
        &self.config
    }

    /// Look up a provider by name. Unknown names fail here, before any I/O.
    pub fn resolve(
        &self,
        name: &str,
    ) -> Result<(ChatProviderKind, Arc<dyn ChatStreamProvider>), ChatProviderError> {
        let kind: ChatProviderKind = name.parse()?;
        let provider = self
            .providers
            .get(&kind)
            .cloned()
            .ok_or_else(|| ChatProviderError::UnsupportedProvider(kind.to_string()))?;
        Ok((kind, provider))
    }

    /// Server-held key first, then whatever the caller supplied.
    pub fn credential_for(
        &self,
        kind: ChatProviderKind,
        caller_key: Option<&str>,
    ) -> Option<String> {
        self.config
            .server_credential(kind)
            .or_else(|| caller_key.map(str::trim).filter(|k| !k.is_empty()))
            .map(str::to_string)
    }

    /// Resolve `provider`, pick a credential, and start streaming. An unknown
    /// provider yields a stream whose only item is the error.
    pub fn stream_tokens(
        &self,
        provider: &str,
        model: &str,
        messages: &[ChatMessage],
        caller_key: Option<&str>,
    ) -> TokenStream {
        match self.resolve(provider) {
            Ok((kind, upstream)) => {
                let credential = self.credential_for(kind, caller_key);
                upstream.stream_tokens(model, messages, credential.as_deref())
            }
            Err(err) => failed_stream(err),
        }
    }
}
