//! OCR fallback for scanned documents.

pub(crate) mod engine;
mod preprocessing;
#[cfg(feature = "native")]
mod pure_engine;

pub use engine::{OcrEngine, OcrEngineBuilder};
pub use preprocessing::{ImagePreprocessor, LumaStats, encode_png};
#[cfg(feature = "native")]
pub use pure_engine::PureOnnxRecognizer;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{OcrError, RecognitionError};
use crate::progress::{CancellationToken, ProgressCallback};

/// Creates recognition workers.
#[async_trait(?Send)]
pub trait Recognizer {
    /// Start a worker for `language` (`+`-separated codes, e.g. `vie+eng`).
    async fn create_worker(&self, language: &str) -> Result<Box<dyn RecognitionWorker>, OcrError>;
}

/// A recognition worker scoped to one OCR run.
#[async_trait(?Send)]
pub trait RecognitionWorker {
    /// Recognize text in an encoded image (PNG).
    async fn recognize(&mut self, image: &[u8]) -> Result<String, RecognitionError>;

    /// Shut the worker down and free its resources.
    async fn terminate(&mut self);
}

/// Progress of a running OCR pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrProgress {
    pub pages_processed: u32,
    pub total_pages: u32,
    pub cancelled: bool,
}

/// Receives the OCR state after every page and on cancellation.
pub type OcrStateCallback = Arc<dyn Fn(&OcrProgress) + Send + Sync>;

/// Per-run options for [`OcrEngine::run`].
#[derive(Clone, Default)]
pub struct OcrRunOptions {
    /// Percentage callback, `round(page / total * 100)` after each page.
    pub progress: Option<ProgressCallback>,
    /// Detailed state callback.
    pub on_state: Option<OcrStateCallback>,
    /// Checked before every batch and every page.
    pub cancel: Option<CancellationToken>,
}

impl OcrRunOptions {
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }
}

/// Text recognized by an OCR run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrOutput {
    /// Marked page blocks, `--- Page N (OCR) ---` first.
    pub text: String,
    /// Pages sent through OCR.
    pub total_pages: u32,
    /// Pages that produced text.
    pub pages_with_text: u32,
    /// Pages skipped after a render or recognition failure.
    pub pages_failed: u32,
    /// The document had more pages than the page cap allowed.
    pub truncated: bool,
}
