use crate::error::PipelineError;
use crate::models::{IndexPoint, RetrievedPassage};
use crate::traits::VectorIndex;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

/// Vector index backed by a Qdrant collection over its REST API. The
/// collection directory on the server side is the durable on-disk form of
/// the index; it survives process restarts.
pub struct QdrantStore {
    endpoint: String,
    collection: String,
    client: reqwest::Client,
    vector_size: usize,
}

impl QdrantStore {
    pub fn new(
        endpoint: impl Into<String>,
        collection: impl Into<String>,
        vector_size: usize,
        timeout: Duration,
    ) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            collection: collection.into(),
            client,
            vector_size,
        })
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!(
            "{}/collections/{}{}",
            self.endpoint.trim_end_matches('/'),
            self.collection,
            suffix
        )
    }

    /// Creates the collection if it does not exist yet. Idempotent; run
    /// once at startup before ingestion or queries.
    pub async fn ensure_collection(&self) -> Result<(), PipelineError> {
        let response = self.client.get(self.collection_url("")).send().await?;
        if response.status().is_success() {
            return Ok(());
        }

        let response = self
            .client
            .put(self.collection_url(""))
            .json(&json!({
                "vectors": {
                    "size": self.vector_size,
                    "distance": "Cosine",
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PipelineError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl VectorIndex for QdrantStore {
    async fn upsert(&self, points: &[IndexPoint]) -> Result<(), PipelineError> {
        if points.is_empty() {
            return Ok(());
        }

        let body = points
            .iter()
            .map(|point| {
                if point.vector.len() != self.vector_size {
                    return Err(PipelineError::Request(format!(
                        "embedding dimension {} != {}",
                        point.vector.len(),
                        self.vector_size
                    )));
                }

                Ok(json!({
                    "id": point.id,
                    "vector": point.vector,
                    "payload": {
                        "chunk_id": point.chunk_id,
                        "document": point.document,
                        "sequence": point.sequence,
                        "text": point.text,
                    },
                }))
            })
            .collect::<Result<Vec<_>, PipelineError>>()?;

        let response = self
            .client
            .put(self.collection_url("/points?wait=true"))
            .json(&json!({ "points": body }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PipelineError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedPassage>, PipelineError> {
        if vector.len() != self.vector_size {
            return Err(PipelineError::Request(format!(
                "query vector dim {} is not {}",
                vector.len(),
                self.vector_size
            )));
        }

        let response = self
            .client
            .post(self.collection_url("/points/search"))
            .json(&json!({
                "vector": vector,
                "limit": top_k,
                "with_payload": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PipelineError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        let hits = parsed
            .pointer("/result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut passages = Vec::new();
        for hit in hits {
            let text = hit
                .pointer("/payload/text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let document = hit
                .pointer("/payload/document")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let score = hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0);

            passages.push(RetrievedPassage {
                text,
                document,
                score,
            });
        }

        Ok(passages)
    }

    async fn count(&self) -> Result<u64, PipelineError> {
        let response = self
            .client
            .post(self.collection_url("/points/count"))
            .json(&json!({ "exact": true }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PipelineError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        parsed
            .pointer("/result/count")
            .and_then(Value::as_u64)
            .ok_or_else(|| PipelineError::BackendResponse {
                backend: "qdrant".to_string(),
                details: "count response has no result.count".to_string(),
            })
    }
}
