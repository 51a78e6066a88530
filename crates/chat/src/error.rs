use thiserror::Error;

/// Failure of an upstream chat provider, before or during streaming.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChatProviderError {
    #[error("unsupported chat provider '{0}'")]
    UnsupportedProvider(String),
    #[error("missing API key for chat provider '{0}'")]
    MissingCredential(String),
    /// Non-2xx response to the streaming request.
    #[error("{provider} returned HTTP {status}: {message}")]
    Http {
        provider: String,
        status: u16,
        message: String,
    },
    /// The provider reported an error inside the event stream.
    #[error("{provider} stream error: {message}")]
    Upstream { provider: String, message: String },
    /// Connection dropped, timed out, or the body could not be read.
    #[error("{provider} transport failure: {message}")]
    Transport { provider: String, message: String },
    #[error("invalid chat provider config: {0}")]
    InvalidConfig(String),
}

impl ChatProviderError {
    pub(crate) fn transport(provider: &str, err: impl std::fmt::Display) -> Self {
        Self::Transport {
            provider: provider.to_string(),
            message: err.to_string(),
        }
    }

    /// HTTP status reported by the upstream, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_mentions_status_and_provider() {
        let err = ChatProviderError::Http {
            provider: "groq".into(),
            status: 401,
            message: "invalid api key".into(),
        };
        let text = err.to_string();
        assert!(text.contains("groq"));
        assert!(text.contains("401"));
        assert!(text.contains("invalid api key"));
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn in_stream_error_has_no_status() {
        let err = ChatProviderError::Upstream {
            provider: "openai".into(),
            message: "overloaded".into(),
        };
        assert_eq!(err.status(), None);
    }
}
