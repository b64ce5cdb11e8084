use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    OpenError(String),
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for PDF text extraction backends.
///
/// Implementors return the text of each page in document order; joining the
/// pages into a single prompt document happens in [`load_document_text`].
pub trait PdfBackend: Send + Sync {
    /// Extract the text of every page of a PDF file, in page order.
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, BackendError>;
}

/// Separator placed between consecutive pages of a document.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Load a PDF through `backend` and concatenate its pages with blank lines.
pub fn load_document_text(path: &Path, backend: &dyn PdfBackend) -> Result<String, BackendError> {
    let pages = backend.extract_pages(path)?;
    tracing::debug!(pages = pages.len(), "PDF pages loaded");
    Ok(pages.join(PAGE_SEPARATOR))
}
