use crate::error::IngestError;
use lopdf::Document;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

pub trait PdfExtractor: Send + Sync {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError> {
        let document =
            Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            // A page extracts its full text or contributes nothing.
            match document.extract_text(&[page_no]) {
                Ok(text) if !text.trim().is_empty() => pages.push(PageText {
                    number: page_no,
                    text,
                }),
                Ok(_) => {}
                Err(error) => {
                    warn!(page = page_no, path = %path.display(), %error, "page yielded no text");
                }
            }
        }

        Ok(pages)
    }
}

/// Concatenates every extractable page text, each followed by a newline,
/// trimmed. An unreadable file degrades to an empty string; the failure is
/// logged, never raised.
pub fn extract_document_text(extractor: &dyn PdfExtractor, path: &Path) -> String {
    match extractor.extract_pages(path) {
        Ok(pages) => {
            let mut text = String::new();
            for page in pages {
                text.push_str(&page.text);
                text.push('\n');
            }
            text.trim().to_string()
        }
        Err(error) => {
            warn!(path = %path.display(), %error, "pdf extraction failed");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{extract_document_text, LopdfExtractor, PageText, PdfExtractor};
    use crate::error::IngestError;
    use std::path::Path;

    struct FixedExtractor {
        pages: Vec<PageText>,
    }

    impl PdfExtractor for FixedExtractor {
        fn extract_pages(&self, _path: &Path) -> Result<Vec<PageText>, IngestError> {
            Ok(self.pages.clone())
        }
    }

    struct BrokenExtractor;

    impl PdfExtractor for BrokenExtractor {
        fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError> {
            Err(IngestError::PdfParse(format!(
                "unreadable: {}",
                path.display()
            )))
        }
    }

    #[test]
    fn pages_are_joined_with_newlines_and_trimmed() {
        let extractor = FixedExtractor {
            pages: vec![
                PageText {
                    number: 1,
                    text: "First page".to_string(),
                },
                PageText {
                    number: 2,
                    text: "Second page".to_string(),
                },
            ],
        };

        let text = extract_document_text(&extractor, Path::new("manual.pdf"));
        assert_eq!(text, "First page\nSecond page");
    }

    #[test]
    fn extraction_failure_degrades_to_empty_text() {
        let text = extract_document_text(&BrokenExtractor, Path::new("corrupt.pdf"));
        assert_eq!(text, "");
    }

    #[test]
    fn unreadable_file_on_disk_degrades_to_empty_text() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4\n%not a real pdf")?;

        let text = extract_document_text(&LopdfExtractor, &path);
        assert_eq!(text, "");
        Ok(())
    }
}
