use crate::error::IngestError;
use crate::models::ManualChunk;

#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    pub window_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self { window_chars: 1_000 }
    }
}

/// Splits `text` into consecutive non-overlapping windows of at most
/// `window_chars` characters, covering the input exactly once and in order.
/// Windows may split mid-word; that is a deliberate simplicity tradeoff.
/// Empty input produces no windows.
pub fn chunk_text(text: &str, window_chars: usize) -> Vec<String> {
    if text.is_empty() || window_chars == 0 {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(window_chars)
        .map(|window| window.iter().collect())
        .collect()
}

/// Builds the ordered chunk sequence for one document, assigning ids of the
/// form `{document}_{sequence}`.
pub fn build_chunks(
    document: &str,
    text: &str,
    config: ChunkerConfig,
) -> Result<Vec<ManualChunk>, IngestError> {
    if config.window_chars == 0 {
        return Err(IngestError::InvalidChunkConfig(
            "window_chars must be at least 1".to_string(),
        ));
    }

    Ok(chunk_text(text, config.window_chars)
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| ManualChunk {
            chunk_id: format!("{document}_{index}"),
            document: document.to_string(),
            sequence: index as u64,
            text: chunk,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_cover_input_exactly_once() {
        let text = "abcdefghij".repeat(37);
        let chunks = chunk_text(&text, 100);

        let rebuilt: String = chunks.concat();
        assert_eq!(rebuilt, text);
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 100));
    }

    #[test]
    fn empty_input_produces_no_chunks() {
        assert!(chunk_text("", 1_000).is_empty());
    }

    #[test]
    fn input_of_exactly_one_window_yields_one_chunk() {
        let text = "x".repeat(1_000);
        let chunks = chunk_text(&text, 1_000);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chars().count(), 1_000);
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let text = "áéíóú".repeat(5);
        let chunks = chunk_text(&text, 7);

        assert_eq!(chunks.concat(), text);
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 7));
    }

    #[test]
    fn document_of_2500_chars_yields_three_chunks_with_sequential_ids() {
        let text = "a".repeat(2_500);
        let chunks = build_chunks("doc.pdf", &text, ChunkerConfig::default()).unwrap();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text.chars().count(), 1_000);
        assert_eq!(chunks[1].text.chars().count(), 1_000);
        assert_eq!(chunks[2].text.chars().count(), 500);
        assert_eq!(chunks[0].chunk_id, "doc.pdf_0");
        assert_eq!(chunks[1].chunk_id, "doc.pdf_1");
        assert_eq!(chunks[2].chunk_id, "doc.pdf_2");
    }

    #[test]
    fn chunk_ids_are_distinct_and_deterministic() {
        let text = "b".repeat(5_120);
        let first = build_chunks("manual.pdf", &text, ChunkerConfig { window_chars: 512 }).unwrap();
        let second = build_chunks("manual.pdf", &text, ChunkerConfig { window_chars: 512 }).unwrap();

        let ids: Vec<&str> = first.iter().map(|chunk| chunk.chunk_id.as_str()).collect();
        let mut unique = ids.clone();
        unique.sort_unstable();
        unique.dedup();

        assert_eq!(unique.len(), ids.len());
        assert_eq!(
            ids,
            second
                .iter()
                .map(|chunk| chunk.chunk_id.as_str())
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn zero_window_is_rejected() {
        let result = build_chunks("doc.pdf", "text", ChunkerConfig { window_chars: 0 });
        assert!(result.is_err());
    }
}
