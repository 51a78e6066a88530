//! Remote embedding providers (Hugging Face Inference API, OpenAI-compatible).

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::EmbeddingError;
use crate::provider::EmbeddingProvider;

const HF_INFERENCE_BASE: &str = "https://api-inference.huggingface.co/models";
const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

/// Longest upstream error body we carry into an error message.
const MAX_ERROR_BODY: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApiProviderKind {
    HuggingFace,
    OpenAI,
}

impl ApiProviderKind {
    fn name(self) -> &'static str {
        match self {
            ApiProviderKind::HuggingFace => "hf",
            ApiProviderKind::OpenAI => "openai",
        }
    }
}

/// Embedding provider speaking one of the supported HTTP APIs.
#[derive(Debug, Clone)]
pub struct HttpEmbeddingProvider {
    kind: ApiProviderKind,
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
}

impl HttpEmbeddingProvider {
    /// Hugging Face feature-extraction endpoint for `cfg.model`.
    pub fn huggingface(cfg: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let url = cfg
            .api_url
            .clone()
            .unwrap_or_else(|| format!("{HF_INFERENCE_BASE}/{}", cfg.model));
        Self::build(ApiProviderKind::HuggingFace, url, cfg)
    }

    /// OpenAI `/v1/embeddings` (or a compatible endpoint via `api_url`).
    pub fn openai(cfg: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let url = cfg
            .api_url
            .clone()
            .unwrap_or_else(|| OPENAI_EMBEDDINGS_URL.to_string());
        Self::build(ApiProviderKind::OpenAI, url, cfg)
    }

    fn build(
        kind: ApiProviderKind,
        url: String,
        cfg: &EmbeddingConfig,
    ) -> Result<Self, EmbeddingError> {
        let api_key = cfg
            .credential()
            .ok_or_else(|| EmbeddingError::MissingCredential(kind.name().to_string()))?
            .to_string();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs.max(1)))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(32)
            .build()
            .map_err(|e| EmbeddingError::InvalidConfig(format!("http client: {e}")))?;
        Ok(Self {
            kind,
            client,
            url,
            model: cfg.model.clone(),
            api_key,
        })
    }

    fn payload(&self, text: &str) -> Value {
        match self.kind {
            ApiProviderKind::HuggingFace => json!({
                "inputs": text,
                "options": { "wait_for_model": true },
            }),
            ApiProviderKind::OpenAI => json!({ "input": text, "model": self.model }),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    fn name(&self) -> &str {
        self.kind.name()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&self.payload(text))
            .send()
            .await
            .map_err(|e| EmbeddingError::Transport(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Upstream {
                status: status.as_u16(),
                message: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let value = response
            .json::<Value>()
            .await
            .map_err(|e| EmbeddingError::MalformedResponse(format!("invalid JSON: {e}")))?;

        first_embedding(value)
    }
}

/// Pull the first embedding out of any of the response shapes providers use:
/// a flat vector, a list of vectors, or an object wrapping either under
/// `embeddings`, `data` (OpenAI style) or `vector`.
pub(crate) fn first_embedding(value: Value) -> Result<Vec<f32>, EmbeddingError> {
    parse_embeddings_from_value(value)?
        .into_iter()
        .next()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            EmbeddingError::MalformedResponse("response did not contain an embedding".into())
        })
}

fn parse_embeddings_from_value(value: Value) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    match value {
        Value::Object(mut map) => {
            if let Some(embeddings) = map.remove("embeddings") {
                return parse_embeddings_from_value(embeddings);
            }
            if let Some(vector) = map.remove("vector") {
                return parse_embeddings_from_value(vector);
            }
            if let Some(embedding) = map.remove("embedding") {
                return parse_embeddings_from_value(embedding);
            }
            match map.remove("data") {
                Some(Value::Array(items)) => {
                    let mut vectors = Vec::with_capacity(items.len());
                    for item in items {
                        vectors.extend(parse_embeddings_from_value(item)?);
                    }
                    Ok(vectors)
                }
                Some(other) => parse_embeddings_from_value(other),
                None => Err(EmbeddingError::MalformedResponse(
                    "unsupported API response shape".into(),
                )),
            }
        }
        Value::Array(items) => {
            if items.is_empty() {
                Ok(Vec::new())
            } else if items.iter().all(|item| matches!(item, Value::Number(_))) {
                parse_embedding_vector(items).map(|vec| vec![vec])
            } else {
                let mut vectors = Vec::with_capacity(items.len());
                for item in items {
                    vectors.extend(parse_embeddings_from_value(item)?);
                }
                Ok(vectors)
            }
        }
        other => Err(EmbeddingError::MalformedResponse(format!(
            "embedding must be an array, got {other}"
        ))),
    }
}

fn parse_embedding_vector(values: Vec<Value>) -> Result<Vec<f32>, EmbeddingError> {
    values
        .into_iter()
        .map(|entry| {
            entry
                .as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| {
                    EmbeddingError::MalformedResponse(format!("non-numeric entry {entry}"))
                })
        })
        .collect()
}
