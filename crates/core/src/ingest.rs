use crate::chunking::{build_chunks, ChunkerConfig};
use crate::embeddings::Embedder;
use crate::error::{IngestError, PipelineError};
use crate::extractor::{extract_document_text, PdfExtractor};
use crate::models::{IndexPoint, ManualChunk};
use crate::traits::VectorIndex;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

/// Recursively lists `.pdf` files under `folder`, sorted for deterministic
/// ingestion order. The filename is the source-document identifier used in
/// chunk ids and citations.
pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

/// Content-hash point id for one chunk. Identical (chunk id, text) pairs
/// always map to the same id, which makes the index upsert idempotent and
/// makes changed content replace the stale point.
pub fn point_id(chunk: &ManualChunk) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(chunk.chunk_id.as_bytes());
    hasher.update([0]);
    hasher.update(chunk.text.as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

#[derive(Debug)]
pub struct SkippedDocument {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug)]
pub struct IngestionReport {
    pub indexed_documents: usize,
    pub chunk_count: usize,
    pub skipped: Vec<SkippedDocument>,
}

/// Scans `folder` and pushes every readable PDF through extract → chunk →
/// embed → upsert. Per-document failures are recorded and skipped, never
/// fatal for the run. Safe to run at every startup: the deterministic point
/// ids make re-ingestion a no-op for unchanged content.
pub async fn ingest_folder<E, V>(
    folder: &Path,
    extractor: &dyn PdfExtractor,
    embedder: &E,
    index: &V,
    config: ChunkerConfig,
) -> Result<IngestionReport, PipelineError>
where
    E: Embedder,
    V: VectorIndex,
{
    let files = discover_pdf_files(folder);
    if files.is_empty() {
        return Err(IngestError::NoDocuments(format!(
            "no pdf files found in {}",
            folder.display()
        ))
        .into());
    }

    let mut indexed_documents = 0;
    let mut chunk_count = 0;
    let mut skipped = Vec::new();

    for path in files {
        let document = match path.file_name().and_then(|name| name.to_str()) {
            Some(name) => name.to_string(),
            None => {
                skipped.push(SkippedDocument {
                    reason: IngestError::MissingFileName(path.display().to_string()).to_string(),
                    path,
                });
                continue;
            }
        };

        let text = extract_document_text(extractor, &path);
        if text.is_empty() {
            skipped.push(SkippedDocument {
                path,
                reason: "no extractable text".to_string(),
            });
            continue;
        }

        let chunks = build_chunks(&document, &text, config).map_err(PipelineError::from)?;
        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();

        let vectors = match embedder.embed_batch(&texts).await {
            Ok(vectors) => vectors,
            Err(error) => {
                skipped.push(SkippedDocument {
                    path,
                    reason: format!("embedding failed: {error}"),
                });
                continue;
            }
        };

        if vectors.len() != chunks.len() {
            skipped.push(SkippedDocument {
                path,
                reason: format!(
                    "embedding count {} does not match chunk count {}",
                    vectors.len(),
                    chunks.len()
                ),
            });
            continue;
        }

        let points: Vec<IndexPoint> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexPoint {
                id: point_id(&chunk),
                chunk_id: chunk.chunk_id,
                document: chunk.document,
                sequence: chunk.sequence,
                text: chunk.text,
                vector,
            })
            .collect();

        match index.upsert(&points).await {
            Ok(()) => {
                info!(%document, chunks = points.len(), "indexed document");
                indexed_documents += 1;
                chunk_count += points.len();
            }
            Err(error) => {
                skipped.push(SkippedDocument {
                    path,
                    reason: format!("index write failed: {error}"),
                });
            }
        }
    }

    Ok(IngestionReport {
        indexed_documents,
        chunk_count,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::CharacterNgramEmbedder;
    use crate::extractor::{LopdfExtractor, PageText};
    use crate::models::RetrievedPassage;
    use async_trait::async_trait;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct RecordingIndex {
        points: Mutex<Vec<IndexPoint>>,
    }

    #[async_trait]
    impl VectorIndex for RecordingIndex {
        async fn upsert(&self, points: &[IndexPoint]) -> Result<(), PipelineError> {
            let mut stored = self.points.lock().unwrap();
            for point in points {
                stored.retain(|existing| existing.id != point.id);
                stored.push(point.clone());
            }
            Ok(())
        }

        async fn query(
            &self,
            _vector: &[f32],
            _top_k: usize,
        ) -> Result<Vec<RetrievedPassage>, PipelineError> {
            Ok(Vec::new())
        }

        async fn count(&self) -> Result<u64, PipelineError> {
            Ok(self.points.lock().unwrap().len() as u64)
        }
    }

    struct TextExtractor {
        text: String,
    }

    impl PdfExtractor for TextExtractor {
        fn extract_pages(&self, _path: &Path) -> Result<Vec<PageText>, IngestError> {
            Ok(vec![PageText {
                number: 1,
                text: self.text.clone(),
            }])
        }
    }

    #[test]
    fn discover_pdf_files_is_recursive() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let nested = dir.path().join("nested");
        fs::create_dir(&nested)?;

        fs::write(dir.path().join("a.pdf"), b"%PDF-1.4\n%fake")?;
        fs::write(nested.join("b.pdf"), b"%PDF-1.4\n%fake")?;
        fs::write(dir.path().join("notes.txt"), b"not a pdf")?;

        let files = discover_pdf_files(dir.path());
        assert_eq!(files.len(), 2);
        Ok(())
    }

    #[test]
    fn point_ids_are_content_derived() {
        let chunk = ManualChunk {
            chunk_id: "doc.pdf_0".to_string(),
            document: "doc.pdf".to_string(),
            sequence: 0,
            text: "hold the reset button".to_string(),
        };

        let same = point_id(&chunk);
        assert_eq!(same, point_id(&chunk));

        let changed = ManualChunk {
            text: "different text".to_string(),
            ..chunk
        };
        assert_ne!(same, point_id(&changed));
    }

    #[tokio::test]
    async fn ingestion_fails_without_pdfs() {
        let dir = tempdir().unwrap();
        let result = ingest_folder(
            dir.path(),
            &LopdfExtractor,
            &CharacterNgramEmbedder { dimensions: 16 },
            &RecordingIndex::default(),
            ChunkerConfig::default(),
        )
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn unreadable_pdfs_are_skipped_not_fatal() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("broken.pdf"), b"%PDF-1.4\n%broken").unwrap();

        let index = RecordingIndex::default();
        let report = ingest_folder(
            dir.path(),
            &LopdfExtractor,
            &CharacterNgramEmbedder { dimensions: 16 },
            &index,
            ChunkerConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(report.indexed_documents, 0);
        assert_eq!(report.chunk_count, 0);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(
            report.skipped[0].path.file_name().and_then(|n| n.to_str()),
            Some("broken.pdf")
        );
    }

    #[tokio::test]
    async fn ingestion_chunks_embeds_and_upserts() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("manual.pdf"), b"%PDF-1.4\n%fake").unwrap();

        let extractor = TextExtractor {
            text: "z".repeat(2_500),
        };
        let index = RecordingIndex::default();

        let report = ingest_folder(
            dir.path(),
            &extractor,
            &CharacterNgramEmbedder { dimensions: 16 },
            &index,
            ChunkerConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(report.indexed_documents, 1);
        assert_eq!(report.chunk_count, 3);

        let stored = index.points.lock().unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[0].chunk_id, "manual.pdf_0");
        assert_eq!(stored[0].vector.len(), 16);
    }

    #[tokio::test]
    async fn re_ingestion_is_idempotent() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("manual.pdf"), b"%PDF-1.4\n%fake").unwrap();

        let extractor = TextExtractor {
            text: "stable content".to_string(),
        };
        let embedder = CharacterNgramEmbedder { dimensions: 16 };
        let index = RecordingIndex::default();

        for _ in 0..2 {
            ingest_folder(
                dir.path(),
                &extractor,
                &embedder,
                &index,
                ChunkerConfig::default(),
            )
            .await
            .unwrap();
        }

        assert_eq!(index.count().await.unwrap(), 1);
    }
}
