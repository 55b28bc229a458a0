use crate::embeddings::Embedder;
use crate::error::PipelineError;
use crate::extractor::{extract_document_text, PdfExtractor};
use crate::ingest::discover_pdf_files;
use crate::models::{AssembledContext, RetrievedPassage};
use crate::traits::VectorIndex;
use async_trait::async_trait;
use std::path::PathBuf;

/// Rendered instead of an empty context when nothing relevant was found.
pub const NO_CONTEXT_PLACEHOLDER: &str = "no relevant information found";

/// Picks and renders the context handed to the completion endpoint. The two
/// implementations are interchangeable; which one runs is configuration.
#[async_trait]
pub trait ContextSelector: Send + Sync {
    async fn select(&self, question: &str) -> Result<AssembledContext, PipelineError>;
}

#[derive(Debug, Clone, Copy)]
pub struct RetrievalOptions {
    pub top_k: usize,
    pub max_context_chars: usize,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            top_k: 3,
            max_context_chars: 12_000,
        }
    }
}

/// Vector-similarity policy: embed the question, query the index, render
/// the top-k passages as labeled excerpt blocks.
pub struct RetrievalSelector<E, V> {
    embedder: E,
    index: V,
    options: RetrievalOptions,
}

impl<E, V> RetrievalSelector<E, V> {
    pub fn new(embedder: E, index: V, options: RetrievalOptions) -> Self {
        Self {
            embedder,
            index,
            options,
        }
    }
}

#[async_trait]
impl<E, V> ContextSelector for RetrievalSelector<E, V>
where
    E: Embedder,
    V: VectorIndex,
{
    async fn select(&self, question: &str) -> Result<AssembledContext, PipelineError> {
        let vector = self.embedder.embed(question).await?;
        let passages = self.index.query(&vector, self.options.top_k).await?;
        Ok(render_passages(&passages, self.options.max_context_chars))
    }
}

#[derive(Debug, Clone)]
pub struct WholeDocumentOptions {
    pub max_documents: usize,
    pub per_document_chars: usize,
    pub max_context_chars: usize,
}

impl Default for WholeDocumentOptions {
    fn default() -> Self {
        Self {
            max_documents: 2,
            per_document_chars: 10_000,
            max_context_chars: 24_000,
        }
    }
}

/// Alternate policy: skip retrieval entirely and hand the model whole
/// documents, each truncated to a per-document budget so total prompt size
/// stays bounded regardless of source document length.
pub struct WholeDocumentSelector<P> {
    folder: PathBuf,
    extractor: P,
    options: WholeDocumentOptions,
}

impl<P> WholeDocumentSelector<P> {
    pub fn new(folder: PathBuf, extractor: P, options: WholeDocumentOptions) -> Self {
        Self {
            folder,
            extractor,
            options,
        }
    }
}

#[async_trait]
impl<P> ContextSelector for WholeDocumentSelector<P>
where
    P: PdfExtractor,
{
    async fn select(&self, _question: &str) -> Result<AssembledContext, PipelineError> {
        let mut passages = Vec::new();

        for path in discover_pdf_files(&self.folder)
            .into_iter()
            .take(self.options.max_documents)
        {
            let document = match path.file_name().and_then(|name| name.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };

            let text = extract_document_text(&self.extractor, &path);
            if text.is_empty() {
                continue;
            }

            passages.push(RetrievedPassage {
                text: truncate_chars(&text, self.options.per_document_chars).to_string(),
                document,
                score: 0.0,
            });
        }

        Ok(render_passages(&passages, self.options.max_context_chars))
    }
}

/// Renders passages best-first as `document:`/`excerpt:` blocks joined by
/// blank lines, never exceeding `max_chars` in total; the least relevant
/// block is truncated or dropped first. Zero passages render the fixed
/// placeholder.
pub fn render_passages(passages: &[RetrievedPassage], max_chars: usize) -> AssembledContext {
    if passages.is_empty() {
        return AssembledContext {
            text: NO_CONTEXT_PLACEHOLDER.to_string(),
            sources: Vec::new(),
        };
    }

    let mut blocks: Vec<String> = Vec::new();
    let mut sources: Vec<String> = Vec::new();
    let mut used = 0usize;

    for passage in passages {
        let block = format!(
            "document: {}\nexcerpt: {}",
            passage.document,
            passage.text.trim()
        );

        let separator = if blocks.is_empty() { 0 } else { 2 };
        let remaining = max_chars.saturating_sub(used + separator);
        if remaining == 0 {
            break;
        }

        let block = if block.chars().count() > remaining {
            truncate_chars(&block, remaining).to_string()
        } else {
            block
        };

        used += separator + block.chars().count();
        if !sources.contains(&passage.document) {
            sources.push(passage.document.clone());
        }
        blocks.push(block);
    }

    AssembledContext {
        text: blocks.join("\n\n").trim().to_string(),
        sources,
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((offset, _)) => &text[..offset],
        None => text,
    }
}
