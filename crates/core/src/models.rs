use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel stored when the caller does not identify the user.
pub const UNKNOWN_USER: &str = "unknown";

/// A bounded slice of a document's extracted text, the unit of embedding
/// and retrieval. Chunk ids are `{document}_{sequence}` and globally unique
/// within one index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualChunk {
    pub chunk_id: String,
    pub document: String,
    pub sequence: u64,
    pub text: String,
}

/// One record written to the vector index: a chunk plus its embedding and
/// the deterministic point id derived from its content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexPoint {
    pub id: u64,
    pub chunk_id: String,
    pub document: String,
    pub sequence: u64,
    pub text: String,
    pub vector: Vec<f32>,
}

/// A retrieved chunk with its source document, ranked best-first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub text: String,
    pub document: String,
    pub score: f64,
}

/// The bounded context string handed to the completion endpoint, plus the
/// source document names it cites.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledContext {
    pub text: String,
    pub sources: Vec<String>,
}

/// One row of the append-only conversation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub user: String,
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}
