//! PDF processing: backends, the text-layer extractor, and its result type.

mod extractor;
pub(crate) mod lopdf_backend;
mod normalize;

pub use extractor::{ExtractOptions, TextExtractor, classify_low_yield};
pub use lopdf_backend::{LopdfBackend, LopdfDocument};
pub use normalize::{assemble_runs, normalize_text};

use async_trait::async_trait;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Failure, PdfError};

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// A positioned run of text on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextItem {
    /// Decoded run content.
    pub text: String,
    /// The source marks a line break after this run.
    pub end_of_line: bool,
    /// Horizontal origin in text space.
    pub x: f32,
    /// Vertical origin in text space.
    pub y: f32,
}

impl TextItem {
    pub fn new(text: impl Into<String>, end_of_line: bool) -> Self {
        Self {
            text: text.into(),
            end_of_line,
            x: 0.0,
            y: 0.0,
        }
    }

    /// Non-blank after trimming.
    pub fn is_meaningful(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Opens documents from raw bytes.
#[async_trait(?Send)]
pub trait PdfBackend {
    /// Parse `data`, reporting encryption and corrupt structure distinctly.
    async fn open(&self, data: &[u8]) -> Result<Box<dyn PdfDocument>>;
}

/// An opened, parsed document.
#[async_trait(?Send)]
pub trait PdfDocument {
    /// Number of pages.
    fn page_count(&self) -> u32;

    /// Positioned text runs of a 1-based page, in content order.
    async fn text_items(&self, page: u32) -> Result<Vec<TextItem>>;

    /// Rasterize a 1-based page at `scale` × its size in points.
    async fn render_page(&self, page: u32, scale: f32) -> Result<RgbaImage>;

    /// Free native resources. Called exactly once, by [`DocumentHandle`].
    fn release(&mut self) {}
}

/// Exclusive owner of an opened document.
///
/// Moving the handle moves ownership; the document is released exactly once,
/// when the last owner closes or drops it.
pub struct DocumentHandle {
    document: Option<Box<dyn PdfDocument>>,
}

impl DocumentHandle {
    pub fn new(document: Box<dyn PdfDocument>) -> Self {
        Self {
            document: Some(document),
        }
    }

    pub fn page_count(&self) -> u32 {
        self.document.as_ref().map_or(0, |d| d.page_count())
    }

    pub fn document(&self) -> &dyn PdfDocument {
        // Only `close` and `drop` take the document out, and both consume self.
        match self.document.as_deref() {
            Some(document) => document,
            None => unreachable!("document handle used after release"),
        }
    }

    /// Release the document now.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(mut document) = self.document.take() {
            debug!("Releasing document with {} pages", document.page_count());
            document.release();
        }
    }
}

impl Drop for DocumentHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for DocumentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentHandle")
            .field("page_count", &self.page_count())
            .finish()
    }
}

/// Where the text of a [`ExtractionResult::Text`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    TextLayer,
    Ocr,
}

/// Counters gathered while extracting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub source: TextSource,
    /// Pages whose text could not be fetched (timeout or page error).
    pub failed_pages: u32,
    /// Runs that were non-blank before normalization.
    pub meaningful_items: usize,
    /// Characters of cleaned text, page markers excluded.
    pub text_chars: usize,
}

/// Outcome of [`TextExtractor::extract`].
#[derive(Debug)]
pub enum ExtractionResult {
    /// Usable text, one marked block per non-empty page.
    Text {
        content: String,
        page_count: u32,
        stats: ExtractionStats,
    },
    /// Too little text and too few runs: probably a scan. The document stays
    /// open so OCR can reuse it.
    ScannedDetected { handle: DocumentHandle },
    /// Classified failure.
    Failure(Failure),
}

impl ExtractionResult {
    pub fn is_text(&self) -> bool {
        matches!(self, ExtractionResult::Text { .. })
    }

    pub fn kind(&self) -> Option<crate::error::ErrorKind> {
        match self {
            ExtractionResult::Text { .. } => None,
            ExtractionResult::ScannedDetected { .. } => {
                Some(crate::error::ErrorKind::ScannedDetected)
            }
            ExtractionResult::Failure(f) => Some(f.kind),
        }
    }

    pub(crate) fn failure(kind: crate::error::ErrorKind, message: impl Into<String>) -> Self {
        ExtractionResult::Failure(Failure::new(kind, message))
    }
}

/// Marker line preceding a page's block of text-layer text.
pub fn page_marker(page: u32) -> String {
    format!("--- Page {page} ---")
}

/// Marker line preceding a page's block of recognized text.
pub fn ocr_page_marker(page: u32) -> String {
    format!("--- Page {page} (OCR) ---")
}


#[cfg(test)]
mod tests {
    use super::testing::FakeDocument;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn handle_releases_exactly_once() {
        let document = FakeDocument::blank(2);
        let log = document.log.clone();

        let handle = DocumentHandle::new(Box::new(document));
        assert_eq!(handle.page_count(), 2);
        handle.close();

        assert_eq!(log.borrow().releases, 1);
    }

    #[test]
    fn dropping_handle_releases() {
        let document = FakeDocument::blank(1);
        let log = document.log.clone();
        {
            let _handle = DocumentHandle::new(Box::new(document));
        }
        assert_eq!(log.borrow().releases, 1);
    }

    #[test]
    fn markers_share_a_shape() {
        assert_eq!(page_marker(3), "--- Page 3 ---");
        assert_eq!(ocr_page_marker(3), "--- Page 3 (OCR) ---");
    }

    #[test]
    fn meaningful_items_ignore_whitespace() {
        assert!(TextItem::new(" a ", false).is_meaningful());
        assert!(!TextItem::new(" \t ", true).is_meaningful());
        assert!(TextItem::new("\u{1}", false).is_meaningful());
    }
}
