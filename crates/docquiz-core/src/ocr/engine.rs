//! OCR engine: renders pages, preprocesses them, and feeds a recognition
//! worker in cooperative batches.

use std::time::Instant;

use image::RgbaImage;
use tracing::{debug, info, warn};

use crate::error::{OcrError, RecognitionError};
use crate::models::config::OcrConfig;
use crate::pdf::{DocumentHandle, ocr_page_marker};
use crate::progress::ProgressReporter;

use super::{
    OcrOutput, OcrProgress, OcrRunOptions, RecognitionWorker, Recognizer,
    preprocessing::{ImagePreprocessor, encode_png},
};

/// Complete OCR engine over a recognizer and a configuration.
pub struct OcrEngine {
    recognizer: Box<dyn Recognizer>,
    preprocessor: ImagePreprocessor,
    config: OcrConfig,
}

/// Builder for OcrEngine.
pub struct OcrEngineBuilder {
    recognizer: Option<Box<dyn Recognizer>>,
    config: OcrConfig,
}

impl OcrEngineBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            recognizer: None,
            config: OcrConfig::default(),
        }
    }

    /// Set the recognizer that hands out workers.
    pub fn with_recognizer(mut self, recognizer: Box<dyn Recognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    /// Set configuration.
    pub fn with_config(mut self, config: OcrConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the OCR engine.
    pub fn build(self) -> Result<OcrEngine, OcrError> {
        let recognizer = self
            .recognizer
            .ok_or_else(|| OcrError::WorkerInit("no recognizer configured".to_string()))?;
        Ok(OcrEngine {
            recognizer,
            preprocessor: ImagePreprocessor::new().with_luma_factor(self.config.luma_factor),
            config: self.config,
        })
    }
}

impl Default for OcrEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a single page produced no text.
enum PageFailure {
    /// Logged and counted; the run continues.
    Skipped(String),
    /// Ends the run.
    Exhausted(String),
}

impl OcrEngine {
    /// Create a new builder.
    pub fn builder() -> OcrEngineBuilder {
        OcrEngineBuilder::new()
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    /// Recognize text on up to `max_pages` pages of `handle`.
    ///
    /// Takes ownership of the handle and releases it when the run ends. The
    /// recognition worker is terminated on every exit path.
    pub async fn run(
        &self,
        handle: DocumentHandle,
        options: OcrRunOptions,
    ) -> Result<OcrOutput, OcrError> {
        let start = Instant::now();
        let page_count = handle.page_count();
        let total = page_count.min(self.config.max_pages);

        info!(
            "Starting OCR: {} of {} pages, batch size {}, scale {}, language {}",
            total, page_count, self.config.batch_size, self.config.render_scale, self.config.language
        );

        let mut worker = self.recognizer.create_worker(&self.config.language).await?;

        let result = self
            .process_pages(&handle, worker.as_mut(), total, &options)
            .await;

        worker.terminate().await;
        handle.close();

        let mut output = result?;
        output.truncated = page_count > total;

        info!(
            "OCR complete: {} of {} pages with text, {} failed, in {}ms",
            output.pages_with_text,
            output.total_pages,
            output.pages_failed,
            start.elapsed().as_millis()
        );

        Ok(output)
    }

    async fn process_pages(
        &self,
        handle: &DocumentHandle,
        worker: &mut dyn RecognitionWorker,
        total: u32,
        options: &OcrRunOptions,
    ) -> Result<OcrOutput, OcrError> {
        let mut reporter = ProgressReporter::new(options.progress.clone());
        let mut state = OcrProgress {
            pages_processed: 0,
            total_pages: total,
            cancelled: false,
        };

        let mut text = String::new();
        let mut pages_with_text = 0;
        let mut pages_failed = 0;

        let batch_size = self.config.batch_size.max(1);
        let mut batch_start = 1;

        while batch_start <= total {
            self.check_cancelled(options, &mut state)?;
            let batch_end = batch_start.saturating_add(batch_size - 1).min(total);
            debug!("OCR batch: pages {}..={}", batch_start, batch_end);

            for page in batch_start..=batch_end {
                self.check_cancelled(options, &mut state)?;

                match self.process_page(handle, worker, page).await {
                    Ok(Some(page_text)) => {
                        if !text.is_empty() {
                            text.push_str("\n\n");
                        }
                        text.push_str(&ocr_page_marker(page));
                        text.push('\n');
                        text.push_str(&page_text);
                        pages_with_text += 1;
                    }
                    Ok(None) => debug!("No text recognized on page {}", page),
                    Err(PageFailure::Skipped(reason)) => {
                        warn!("OCR skipped page {}: {}", page, reason);
                        pages_failed += 1;
                    }
                    Err(PageFailure::Exhausted(reason)) => {
                        warn!("OCR aborted on page {}: {}", page, reason);
                        return Err(OcrError::ResourceExhausted { page, reason });
                    }
                }

                state.pages_processed = page;
                reporter.report_fraction(0, 100, page, total);
                if let Some(on_state) = &options.on_state {
                    on_state(&state);
                }
            }

            batch_start = batch_end + 1;
            tokio::task::yield_now().await;
        }

        if text.is_empty() && total > 0 {
            return Err(OcrError::NoTextRecognized(total));
        }

        Ok(OcrOutput {
            text,
            total_pages: total,
            pages_with_text,
            pages_failed,
            truncated: false,
        })
    }

    fn check_cancelled(
        &self,
        options: &OcrRunOptions,
        state: &mut OcrProgress,
    ) -> Result<(), OcrError> {
        if !options.is_cancelled() {
            return Ok(());
        }
        state.cancelled = true;
        if let Some(on_state) = &options.on_state {
            on_state(state);
        }
        info!(
            "OCR cancelled after {} of {} pages",
            state.pages_processed, state.total_pages
        );
        Err(OcrError::Cancelled {
            pages_processed: state.pages_processed,
            total_pages: state.total_pages,
        })
    }

    async fn process_page(
        &self,
        handle: &DocumentHandle,
        worker: &mut dyn RecognitionWorker,
        page: u32,
    ) -> Result<Option<String>, PageFailure> {
        let raster = handle
            .document()
            .render_page(page, self.config.render_scale)
            .await
            .map_err(|e| PageFailure::Skipped(e.to_string()))?;

        let raster = self.prepare(raster, page);
        let png = encode_png(&raster).map_err(|e| PageFailure::Skipped(e.to_string()))?;

        match worker.recognize(&png).await {
            Ok(recognized) => {
                let recognized = recognized.trim();
                Ok((!recognized.is_empty()).then(|| recognized.to_string()))
            }
            Err(RecognitionError::Failed(reason)) => Err(PageFailure::Skipped(reason)),
            Err(RecognitionError::ResourceExhausted(reason)) => Err(PageFailure::Exhausted(reason)),
        }
    }

    /// Binarize when enabled; fall back to the raw raster on failure.
    fn prepare(&self, raster: RgbaImage, page: u32) -> RgbaImage {
        if !self.config.binarize {
            return raster;
        }
        match self.preprocessor.binarize(&raster) {
            Ok((binarized, stats)) => {
                debug!(
                    "Page {}: avg luma {:.1}, threshold {:.1}",
                    page, stats.avg_luma, stats.threshold
                );
                binarized
            }
            Err(e) => {
                warn!("Preprocessing failed on page {}, using raw raster: {}", page, e);
                raster
            }
        }
    }
}
