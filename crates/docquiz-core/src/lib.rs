//! Core library for turning PDFs into quiz-generation input.
//!
//! This crate provides:
//! - Text-layer extraction with page markers and text normalization
//! - Scanned-document detection, distinct from broken font encodings
//! - An OCR fallback with batching, binarization and cancellation
//! - Answer shuffling and duplicate avoidance for generated quizzes

pub mod error;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod progress;
pub mod quiz;

pub use error::{DocquizError, ErrorKind, Failure, Result};
pub use models::config::DocquizConfig;
pub use ocr::{OcrEngine, OcrOutput, OcrProgress, OcrRunOptions, Recognizer};
pub use pdf::{DocumentHandle, ExtractOptions, ExtractionResult, TextExtractor};
pub use progress::{CancellationToken, ProgressCallback};
pub use quiz::{Quiz, QuizQuestion, QuestionHistory};

use std::path::Path;

use crate::error::OcrError;
use crate::pdf::LopdfBackend;

/// The assembled ingestion pipeline.
///
/// Built once at startup from a [`DocquizConfig`]; every component receives
/// its settings from here rather than from process-wide state.
pub struct Pipeline {
    extractor: TextExtractor,
}

impl Pipeline {
    /// Build the pipeline with the bundled backends.
    ///
    /// When the OCR models cannot be loaded the pipeline still extracts text
    /// layers; OCR requests then fail with
    /// [`ErrorKind::LibraryLoadFailure`].
    pub fn init(config: &DocquizConfig) -> Result<Self> {
        validate(config)?;
        let pipeline = Self::text_only(config);

        #[cfg(feature = "native")]
        {
            match ocr::PureOnnxRecognizer::from_runtime(&config.runtime) {
                Ok(recognizer) => {
                    tracing::info!("OCR models loaded from {}", config.runtime.model_dir.display());
                    return Self::with_recognizer(config, Box::new(recognizer));
                }
                Err(e) => tracing::warn!("OCR unavailable: {}", e),
            }
        }

        Ok(pipeline)
    }

    /// Build the pipeline around a caller-supplied recognizer.
    pub fn with_recognizer(config: &DocquizConfig, recognizer: Box<dyn Recognizer>) -> Result<Self> {
        validate(config)?;
        let engine = OcrEngine::builder()
            .with_recognizer(recognizer)
            .with_config(config.ocr.clone())
            .build()?;
        let Self { extractor } = Self::text_only(config);
        Ok(Self {
            extractor: extractor.with_ocr(engine),
        })
    }

    fn text_only(config: &DocquizConfig) -> Self {
        let backend = LopdfBackend::new().with_max_dimension(config.ocr.max_render_dimension);
        Self {
            extractor: TextExtractor::new(Box::new(backend), config.extraction.clone()),
        }
    }

    pub fn extractor(&self) -> &TextExtractor {
        &self.extractor
    }

    pub fn has_ocr(&self) -> bool {
        self.extractor.ocr().is_some()
    }

    /// Extract text from PDF bytes.
    pub async fn extract(&self, data: &[u8], options: ExtractOptions) -> ExtractionResult {
        self.extractor.extract(data, options).await
    }

    /// Extract text from a PDF file.
    pub async fn extract_file(
        &self,
        path: impl AsRef<Path>,
        options: ExtractOptions,
    ) -> Result<ExtractionResult> {
        let data = std::fs::read(path.as_ref())?;
        Ok(self.extract(&data, options).await)
    }

    /// Run OCR over a document the extractor flagged as scanned.
    pub async fn ocr(
        &self,
        handle: DocumentHandle,
        options: OcrRunOptions,
    ) -> std::result::Result<OcrOutput, OcrError> {
        match self.extractor.ocr() {
            Some(engine) => engine.run(handle, options).await,
            None => {
                handle.close();
                Err(OcrError::WorkerInit("OCR models are not available".to_string()))
            }
        }
    }

    /// Open PDF bytes and send every page through OCR, skipping the text layer.
    pub async fn force_ocr(
        &self,
        data: &[u8],
        options: OcrRunOptions,
    ) -> std::result::Result<OcrOutput, Failure> {
        let handle = self.extractor.open(data).await?;
        self.ocr(handle, options).await.map_err(Failure::from)
    }
}

fn validate(config: &DocquizConfig) -> Result<()> {
    let ocr = &config.ocr;
    if ocr.max_pages == 0 {
        return Err(DocquizError::Config("ocr.max_pages must be at least 1".into()));
    }
    if ocr.batch_size == 0 {
        return Err(DocquizError::Config("ocr.batch_size must be at least 1".into()));
    }
    if !(ocr.render_scale.is_finite() && ocr.render_scale > 0.0) {
        return Err(DocquizError::Config(format!(
            "ocr.render_scale must be positive, got {}",
            ocr.render_scale
        )));
    }
    if !(ocr.luma_factor.is_finite() && ocr.luma_factor > 0.0) {
        return Err(DocquizError::Config(format!(
            "ocr.luma_factor must be positive, got {}",
            ocr.luma_factor
        )));
    }
    if ocr.languages().is_empty() {
        return Err(DocquizError::Config("ocr.language is empty".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::engine::tests::ScriptedRecognizer;
    use crate::pdf::lopdf_backend::tests::make_pdf;
    use pretty_assertions::assert_eq;

    #[test]
    fn rejects_invalid_config() {
        let mut config = DocquizConfig::default();
        config.ocr.batch_size = 0;
        assert!(matches!(Pipeline::init(&config), Err(DocquizError::Config(_))));

        let mut config = DocquizConfig::default();
        config.ocr.render_scale = -1.0;
        assert!(Pipeline::init(&config).is_err());

        let mut config = DocquizConfig::default();
        config.ocr.max_pages = 0;
        let err = Pipeline::with_recognizer(&config, Box::new(ScriptedRecognizer::texts(&["x"])))
            .err()
            .unwrap();
        assert!(err.to_string().contains("ocr.max_pages"), "got {err}");
    }

    #[tokio::test]
    async fn missing_models_leave_text_extraction_working() {
        let mut config = DocquizConfig::default();
        config.runtime.model_dir = "/nonexistent/docquiz-models".into();
        let pipeline = Pipeline::init(&config).unwrap();
        assert!(!pipeline.has_ocr());

        let data = make_pdf(&["BT /F1 12 Tf 72 700 Td (Photosynthesis converts light energy) Tj ET"]);
        let result = pipeline.extract(&data, ExtractOptions::default()).await;
        assert!(result.is_text(), "got {:?}", result.kind());

        let err = pipeline.force_ocr(&data, OcrRunOptions::default()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::LibraryLoadFailure);
    }

    #[tokio::test]
    async fn scanned_handle_goes_through_ocr() {
        let recognizer = ScriptedRecognizer::texts(&["Recognized words"]);
        let pipeline =
            Pipeline::with_recognizer(&DocquizConfig::default(), Box::new(recognizer)).unwrap();

        let data = make_pdf(&[""]);
        let handle = match pipeline.extract(&data, ExtractOptions::default()).await {
            ExtractionResult::ScannedDetected { handle } => handle,
            other => panic!("expected scanned, got {:?}", other.kind()),
        };

        let output = pipeline.ocr(handle, OcrRunOptions::default()).await.unwrap();
        assert_eq!(output.text, "--- Page 1 (OCR) ---\nRecognized words");
    }

    #[tokio::test]
    async fn force_ocr_reports_open_failures() {
        let pipeline = Pipeline::with_recognizer(
            &DocquizConfig::default(),
            Box::new(ScriptedRecognizer::texts(&[])),
        )
        .unwrap();

        let err = pipeline.force_ocr(b"", OcrRunOptions::default()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::EmptyFile);
    }
}
