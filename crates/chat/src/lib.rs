//! Streaming chat completion providers.
//!
//! Every upstream is reduced to the same shape: a lazy stream of text
//! fragments ending in success or a single [`ChatProviderError`].
//!
//! ```no_run
//! use chat::{ChatMessage, ChatProviders, ChatProvidersConfig};
//! use futures::StreamExt;
//!
//! # async fn demo() -> Result<(), chat::ChatProviderError> {
//! let providers = ChatProviders::from_config(ChatProvidersConfig::default())?;
//! let mut tokens = providers.stream_tokens("mock", "any", &[ChatMessage::user("hi")], None);
//! while let Some(token) = tokens.next().await {
//!     print!("{}", token?);
//! }
//! # Ok(())
//! # }
//! ```

mod anthropic;
mod error;
mod mock;
mod openai;
mod provider;
pub mod sse;
mod types;

pub use anthropic::AnthropicProvider;
pub use error::ChatProviderError;
pub use mock::MockChatProvider;
pub use openai::OpenAiCompatibleProvider;
pub use provider::{
    ChatProviderKind, ChatProviders, ChatProvidersConfig, ChatStreamProvider, TokenStream,
};
pub use types::{latest_user_message, ChatMessage, ChatRole};
