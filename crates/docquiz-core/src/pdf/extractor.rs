//! Text-layer extraction with scanned-document classification.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::{ErrorKind, Failure, PdfError};
use crate::models::config::ExtractionConfig;
use crate::ocr::{OcrEngine, OcrOutput, OcrRunOptions};
use crate::progress::{ProgressCallback, ProgressReporter};

use super::{
    DocumentHandle, ExtractionResult, ExtractionStats, PdfBackend, TextSource, assemble_runs,
    normalize_text, page_marker,
};

/// Progress reached once the document is open.
const OPEN_PROGRESS: u8 = 20;

/// Options for a single [`TextExtractor::extract`] call.
#[derive(Clone, Default)]
pub struct ExtractOptions {
    /// Receives 0..=100 over the text pass.
    pub progress: Option<ProgressCallback>,
    /// When set, scanned documents go straight through OCR with these run
    /// options instead of coming back as [`ExtractionResult::ScannedDetected`].
    pub auto_ocr: Option<OcrRunOptions>,
}

impl ExtractOptions {
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_auto_ocr(mut self, options: OcrRunOptions) -> Self {
        self.auto_ocr = Some(options);
        self
    }
}

/// Decide why a document yielded too little text.
///
/// Few non-blank runs means the pages are images; many runs that clean up to
/// nothing means the fonts carry no usable encoding.
pub fn classify_low_yield(meaningful_items: usize, scanned_item_floor: usize) -> ErrorKind {
    if meaningful_items < scanned_item_floor {
        ErrorKind::ScannedDetected
    } else {
        ErrorKind::EncodingFailure
    }
}

/// Pulls the text layer out of PDFs.
pub struct TextExtractor {
    backend: Box<dyn PdfBackend>,
    config: ExtractionConfig,
    ocr: Option<OcrEngine>,
}

/// Accumulated text pass output.
struct TextPass {
    content: String,
    stats: ExtractionStats,
}

impl TextExtractor {
    pub fn new(backend: Box<dyn PdfBackend>, config: ExtractionConfig) -> Self {
        Self {
            backend,
            config,
            ocr: None,
        }
    }

    /// Attach the OCR engine used for authorized fallbacks.
    pub fn with_ocr(mut self, engine: OcrEngine) -> Self {
        self.ocr = Some(engine);
        self
    }

    pub fn ocr(&self) -> Option<&OcrEngine> {
        self.ocr.as_ref()
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Open `data` and check it has pages, without reading any text.
    pub async fn open(&self, data: &[u8]) -> Result<DocumentHandle, Failure> {
        if data.is_empty() {
            return Err(Failure::new(ErrorKind::EmptyFile, "the file is empty"));
        }

        let document = self.backend.open(data).await.map_err(Failure::from)?;
        let handle = DocumentHandle::new(document);

        if handle.page_count() == 0 {
            return Err(Failure::new(
                ErrorKind::EmptyDocument,
                "the document has no pages",
            ));
        }
        Ok(handle)
    }

    /// Extract the text layer of `data` and classify the outcome.
    pub async fn extract(&self, data: &[u8], options: ExtractOptions) -> ExtractionResult {
        let start = Instant::now();
        let mut reporter = ProgressReporter::new(options.progress.clone());
        reporter.report(0);

        let handle = match self.open(data).await {
            Ok(handle) => handle,
            Err(failure) => {
                warn!("Could not open document: {}", failure);
                return ExtractionResult::Failure(failure);
            }
        };
        reporter.report(OPEN_PROGRESS);

        let page_count = handle.page_count();
        info!("Extracting text from {} pages", page_count);

        let pass = self.read_pages(&handle, &mut reporter).await;
        let text_chars = pass.stats.text_chars;

        if text_chars >= self.config.min_text_chars {
            handle.close();
            info!(
                "Extracted {} characters from {} pages ({} failed) in {}ms",
                text_chars,
                page_count,
                pass.stats.failed_pages,
                start.elapsed().as_millis()
            );
            return ExtractionResult::Text {
                content: pass.content,
                page_count,
                stats: pass.stats,
            };
        }

        match classify_low_yield(pass.stats.meaningful_items, self.config.scanned_item_floor) {
            ErrorKind::ScannedDetected => {
                info!(
                    "Low text yield ({} chars, {} runs): treating as scanned",
                    text_chars, pass.stats.meaningful_items
                );
                match options.auto_ocr {
                    Some(ocr_options) => self.run_ocr(handle, pass.stats, ocr_options).await,
                    None => ExtractionResult::ScannedDetected { handle },
                }
            }
            kind => {
                warn!(
                    "{} text runs cleaned down to {} characters: unreadable font encoding",
                    pass.stats.meaningful_items, text_chars
                );
                ExtractionResult::failure(
                    kind,
                    format!(
                        "the document has {} text runs but they do not decode to readable text",
                        pass.stats.meaningful_items
                    ),
                )
            }
        }
    }

    async fn read_pages(&self, handle: &DocumentHandle, reporter: &mut ProgressReporter) -> TextPass {
        let page_count = handle.page_count();
        let timeout = self.config.page_timeout();

        let mut content = String::new();
        let mut stats = ExtractionStats {
            source: TextSource::TextLayer,
            failed_pages: 0,
            meaningful_items: 0,
            text_chars: 0,
        };

        for page in 1..=page_count {
            let fetched = tokio::time::timeout(timeout, handle.document().text_items(page)).await;
            let items = match fetched {
                Ok(Ok(items)) => Some(items),
                Ok(Err(e)) => {
                    warn!("Skipping page {}: {}", page, e);
                    None
                }
                Err(_) => {
                    let e = PdfError::PageTimeout(page);
                    warn!("Skipping page {}: {} ({})", page, e, e.kind());
                    None
                }
            };

            match items {
                Some(items) => {
                    let meaningful = items.iter().filter(|item| item.is_meaningful()).count();
                    let text = normalize_text(&assemble_runs(&items));
                    debug!(
                        "Page {}: {} runs, {} meaningful, {} chars",
                        page,
                        items.len(),
                        meaningful,
                        text.chars().count()
                    );

                    stats.meaningful_items += meaningful;
                    if !text.is_empty() {
                        stats.text_chars += text.chars().count();
                        if !content.is_empty() {
                            content.push_str("\n\n");
                        }
                        content.push_str(&page_marker(page));
                        content.push('\n');
                        content.push_str(&text);
                    }
                }
                None => stats.failed_pages += 1,
            }

            reporter.report_fraction(OPEN_PROGRESS, 100, page, page_count);
        }

        TextPass { content, stats }
    }

    async fn run_ocr(
        &self,
        handle: DocumentHandle,
        stats: ExtractionStats,
        options: OcrRunOptions,
    ) -> ExtractionResult {
        let Some(engine) = &self.ocr else {
            warn!("OCR authorized but no OCR engine is configured");
            return ExtractionResult::ScannedDetected { handle };
        };

        let page_count = handle.page_count();
        match engine.run(handle, options).await {
            Ok(output) => {
                let stats = ExtractionStats {
                    meaningful_items: stats.meaningful_items,
                    ..ExtractionStats::from_ocr(&output)
                };
                ExtractionResult::Text {
                    content: output.text,
                    page_count,
                    stats,
                }
            }
            Err(e) => {
                if e.is_cancelled() {
                    info!("OCR cancelled: {}", e);
                } else {
                    warn!("OCR failed: {}", e);
                }
                ExtractionResult::Failure(e.into())
            }
        }
    }
}

impl ExtractionStats {
    /// Counters for text produced by an OCR run.
    pub fn from_ocr(output: &OcrOutput) -> Self {
        Self {
            source: TextSource::Ocr,
            failed_pages: output.pages_failed,
            meaningful_items: 0,
            text_chars: content_chars(&output.text),
        }
    }
}

/// Characters of marked text, marker lines excluded.
fn content_chars(text: &str) -> usize {
    text.lines()
        .filter(|line| !(line.starts_with("--- Page ") && line.ends_with(" ---")))
        .map(|line| line.chars().count())
        .sum()
}
