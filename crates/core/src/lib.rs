pub mod chunking;
pub mod completion;
pub mod context;
pub mod conversation;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod stores;
pub mod traits;

pub use chunking::{build_chunks, chunk_text, ChunkerConfig};
pub use completion::{
    compose_prompt, CompletionClient, CompletionOptions, OpenAiCompatClient, FALLBACK_ANSWER,
};
pub use context::{
    render_passages, ContextSelector, RetrievalOptions, RetrievalSelector, WholeDocumentOptions,
    WholeDocumentSelector, NO_CONTEXT_PLACEHOLDER,
};
pub use conversation::{ConversationStore, SqliteConversationStore};
pub use embeddings::{
    CharacterNgramEmbedder, Embedder, RemoteEmbedder, DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{IngestError, PipelineError};
pub use extractor::{extract_document_text, LopdfExtractor, PageText, PdfExtractor};
pub use ingest::{discover_pdf_files, ingest_folder, point_id, IngestionReport, SkippedDocument};
pub use models::{
    AssembledContext, ConversationRecord, IndexPoint, ManualChunk, RetrievedPassage, UNKNOWN_USER,
};
pub use pipeline::AnswerPipeline;
pub use stores::QdrantStore;
pub use traits::VectorIndex;
