use crate::error::PipelineError;
use crate::models::{IndexPoint, RetrievedPassage};
use async_trait::async_trait;

/// Durable nearest-neighbor store over chunk embeddings. Written during
/// ingestion, read by every query; the similarity metric is whatever the
/// backing index was created with and stays consistent per instance.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Inserts or overwrites points by id. Point ids are content-derived,
    /// so re-adding identical content is a no-op.
    async fn upsert(&self, points: &[IndexPoint]) -> Result<(), PipelineError>;

    /// Returns at most `top_k` stored chunks ordered by non-increasing
    /// similarity to `vector`. An empty index yields an empty result,
    /// never an error.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedPassage>, PipelineError>;

    async fn count(&self) -> Result<u64, PipelineError>;
}
