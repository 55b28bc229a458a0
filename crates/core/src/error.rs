use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("no documents to ingest: {0}")]
    NoDocuments(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("ingestion failed: {0}")]
    Ingest(#[from] IngestError),

    #[error("request failed: {0}")]
    Request(String),
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
