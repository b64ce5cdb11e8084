use std::path::Path;

use mupdf::{Document, TextPageFlags};

use structex_core::{BackendError, PdfBackend};

/// MuPDF-based implementation of [`PdfBackend`].
///
/// This crate isolates the mupdf dependency (AGPL-3.0) so that the core
/// pipeline and its tests do not transitively depend on it.
///
/// Each page's text is read block by block, one output line per text line.
/// Lines are stripped of trailing whitespace and empty pages yield an empty
/// string so page positions are preserved.
#[derive(Debug, Default)]
pub struct MupdfBackend {
    /// Stop after this many pages. `None` reads the whole document.
    max_pages: Option<usize>,
}

impl MupdfBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit extraction to the first `max_pages` pages. Pass `0` to read all pages.
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = if max_pages > 0 { Some(max_pages) } else { None };
        self
    }
}

impl PdfBackend for MupdfBackend {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, BackendError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| BackendError::OpenError("invalid path encoding".into()))?;

        let document =
            Document::open(path_str).map_err(|e| BackendError::OpenError(e.to_string()))?;

        let limit = self.max_pages.unwrap_or(usize::MAX);
        let mut pages_text = Vec::new();

        for page_result in document
            .pages()
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?
            .take(limit)
        {
            let page = page_result.map_err(|e| BackendError::ExtractionError(e.to_string()))?;
            let text_page = page
                .to_text_page(TextPageFlags::empty())
                .map_err(|e| BackendError::ExtractionError(e.to_string()))?;

            let mut lines = Vec::new();
            for block in text_page.blocks() {
                for line in block.lines() {
                    let line_text: String = line
                        .chars()
                        .map(|c| c.char().unwrap_or('\u{FFFD}'))
                        .collect();
                    lines.push(line_text.trim_end().to_string());
                }
            }
            pages_text.push(lines.join("\n"));
        }

        Ok(pages_text)
    }
}
