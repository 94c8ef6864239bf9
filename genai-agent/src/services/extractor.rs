//! Page-by-page text extraction from paginated documents.

use lopdf::Document;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Uploaded file is empty")]
    Empty,

    #[error("Failed to read PDF: {0}")]
    Load(String),

    #[error("PDF contains no pages")]
    NoPages,

    #[error("Failed to extract text from page {page}: {message}")]
    Page { page: u32, message: String },
}

/// Turns a document on disk into its page texts, in page order.
///
/// Implementations do blocking I/O; call them from `spawn_blocking`.
pub trait TextExtractor: Send + Sync {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, ExtractError>;
}

/// PDF extraction backed by `lopdf`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, ExtractError> {
        let len = std::fs::metadata(path)
            .map_err(|e| ExtractError::Load(e.to_string()))?
            .len();
        if len == 0 {
            return Err(ExtractError::Empty);
        }

        let doc = Document::load(path).map_err(|e| ExtractError::Load(e.to_string()))?;

        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(ExtractError::NoPages);
        }

        // get_pages is keyed by page number, so iteration is in document order.
        pages
            .keys()
            .map(|&page| {
                doc.extract_text(&[page])
                    .map_err(|e| ExtractError::Page {
                        page,
                        message: e.to_string(),
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn empty_file_is_rejected() {
        let file = temp_file(b"");
        let err = PdfTextExtractor.extract_pages(file.path()).unwrap_err();
        assert!(matches!(err, ExtractError::Empty));
    }

    #[test]
    fn garbage_is_a_load_error() {
        let file = temp_file(b"definitely not a pdf document");
        let err = PdfTextExtractor.extract_pages(file.path()).unwrap_err();
        assert!(matches!(err, ExtractError::Load(_)));
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PdfTextExtractor
            .extract_pages(&dir.path().join("gone.pdf"))
            .unwrap_err();
        assert!(matches!(err, ExtractError::Load(_)));
    }
}
