use crate::error::PipelineError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

/// Vector width of `all-MiniLM-L6-v2`, the default sentence-embedding model.
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 384;

/// Maps text to fixed-dimension vectors. One instance is constructed at
/// startup and shared; identical input must yield identical output.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError>;

    /// Embeds a batch, preserving input order and length.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError>;
}

/// Deterministic local model: hashed character trigrams, L2-normalized.
/// Needs no network and no model download, which also makes it the test
/// double of choice.
#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl CharacterNgramEmbedder {
    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

#[async_trait]
impl Embedder for CharacterNgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        Ok(self.vectorize(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        Ok(texts.iter().map(|text| self.vectorize(text)).collect())
    }
}

/// Client for an OpenAI-compatible `/embeddings` endpoint serving a
/// sentence-embedding model.
pub struct RemoteEmbedder {
    endpoint: String,
    model: String,
    dimensions: usize,
    client: reqwest::Client,
}

impl RemoteEmbedder {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        dimensions: usize,
        timeout: Duration,
    ) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            model: model.into(),
            dimensions,
            client,
        })
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| PipelineError::BackendResponse {
            backend: "embeddings".to_string(),
            details: "empty embedding batch".to_string(),
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(format!(
                "{}/embeddings",
                self.endpoint.trim_end_matches('/')
            ))
            .json(&json!({
                "model": self.model,
                "input": texts,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PipelineError::BackendResponse {
                backend: "embeddings".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        let data = parsed
            .pointer("/data")
            .and_then(Value::as_array)
            .ok_or_else(|| PipelineError::BackendResponse {
                backend: "embeddings".to_string(),
                details: "response has no data array".to_string(),
            })?;

        // The endpoint may reorder items; the index field restores input order.
        let mut vectors = vec![Vec::new(); texts.len()];
        for item in data {
            let index = item
                .pointer("/index")
                .and_then(Value::as_u64)
                .ok_or_else(|| PipelineError::BackendResponse {
                    backend: "embeddings".to_string(),
                    details: "embedding item has no index".to_string(),
                })? as usize;

            let embedding = item
                .pointer("/embedding")
                .and_then(Value::as_array)
                .ok_or_else(|| PipelineError::BackendResponse {
                    backend: "embeddings".to_string(),
                    details: "embedding item has no vector".to_string(),
                })?;

            if index >= vectors.len() {
                return Err(PipelineError::BackendResponse {
                    backend: "embeddings".to_string(),
                    details: format!("embedding index {index} out of range"),
                });
            }

            vectors[index] = embedding
                .iter()
                .map(|value| value.as_f64().unwrap_or(0.0) as f32)
                .collect();
        }

        if vectors.iter().any(Vec::is_empty) {
            return Err(PipelineError::BackendResponse {
                backend: "embeddings".to_string(),
                details: format!(
                    "expected {} embeddings, response was incomplete",
                    texts.len()
                ),
            });
        }

        Ok(vectors)
    }
}
