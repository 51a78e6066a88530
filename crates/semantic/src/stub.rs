use async_trait::async_trait;

use crate::error::EmbeddingError;
use crate::normalize::l2_normalize_in_place;
use crate::provider::EmbeddingProvider;

/// Width of the mock vectors, matching the default stored dimension.
pub const MOCK_EMBEDDING_DIMENSION: usize = 1024;

/// Deterministic offline embedder for tests and local development.
///
/// Values are sinusoids of the text's character count and code-point sum, so
/// equal strings always map to the same unit vector with no network access.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockEmbeddingProvider;

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(make_stub_embedding(text))
    }
}

pub(crate) fn make_stub_embedding(text: &str) -> Vec<f32> {
    let len = text.chars().count() as f64;
    let sum: u64 = text.chars().map(|c| u64::from(c as u32)).sum();
    let seed = if sum == 0 { 1.0 } else { sum as f64 };

    let mut v: Vec<f32> = (0..MOCK_EMBEDDING_DIMENSION)
        .map(|i| {
            let i = i as f64;
            ((0.017 * (i + 1.0) * len).sin() + (0.013 * (i + 7.0) * seed).cos()) as f32
        })
        .collect();
    l2_normalize_in_place(&mut v);
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[test]
    fn mock_is_unit_length() {
        for text in ["", "a", "hello world", "a much longer sentence about notes"] {
            let v = make_stub_embedding(text);
            assert_eq!(v.len(), MOCK_EMBEDDING_DIMENSION);
            assert!((norm(&v) - 1.0).abs() < 1e-3, "{text:?}");
        }
    }

    #[test]
    fn mock_is_deterministic() {
        assert_eq!(make_stub_embedding("rust"), make_stub_embedding("rust"));
        assert_ne!(make_stub_embedding("rust"), make_stub_embedding("go"));
    }

    #[tokio::test]
    async fn provider_reports_name() {
        let provider = MockEmbeddingProvider;
        assert_eq!(provider.name(), "mock");
        assert_eq!(provider.embed("x").await.unwrap().len(), 1024);
    }
}
