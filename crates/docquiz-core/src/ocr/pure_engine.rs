//! Recognition workers backed by `pure-onnx-ocr` (pure Rust, no external
//! ONNX Runtime).

use std::path::PathBuf;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{OcrError, RecognitionError};
use crate::models::config::RuntimeConfig;

use super::{RecognitionWorker, Recognizer};

/// Languages the latin PaddleOCR dictionary covers.
const LATIN_LANGUAGES: &[&str] = &[
    "eng", "vie", "fra", "deu", "spa", "ita", "por", "nld", "pol", "ces", "ron", "hun", "tur",
    "ind", "msa", "swe", "nor", "dan", "fin",
];

/// Hands out `pure-onnx-ocr` workers loaded from a model directory.
pub struct PureOnnxRecognizer {
    det_path: PathBuf,
    rec_path: PathBuf,
    dict_path: PathBuf,
}

impl PureOnnxRecognizer {
    /// Resolve model files from the runtime configuration.
    ///
    /// Missing files are a load failure: the user can fetch the models and
    /// retry, the document itself is not at fault.
    pub fn from_runtime(runtime: &RuntimeConfig) -> Result<Self, OcrError> {
        let det_path = runtime.model_path(&runtime.detection_model);
        let rec_path = runtime.model_path(&runtime.recognition_model);
        let dict_path = runtime.model_path(&runtime.dictionary);

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(OcrError::WorkerInit(format!(
                    "model file not found: {}",
                    path.display()
                )));
            }
        }

        Ok(Self {
            det_path,
            rec_path,
            dict_path,
        })
    }
}

#[async_trait(?Send)]
impl Recognizer for PureOnnxRecognizer {
    async fn create_worker(&self, language: &str) -> Result<Box<dyn RecognitionWorker>, OcrError> {
        let unsupported: Vec<&str> = language
            .split('+')
            .map(str::trim)
            .filter(|code| !code.is_empty() && !LATIN_LANGUAGES.contains(code))
            .collect();
        if !unsupported.is_empty() {
            return Err(OcrError::WorkerInit(format!(
                "unsupported OCR language(s): {}",
                unsupported.join(", ")
            )));
        }

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&self.det_path)
            .rec_model_path(&self.rec_path)
            .dictionary_path(&self.dict_path)
            .build()
            .map_err(|e| OcrError::WorkerInit(format!("pure-onnx-ocr: {}", e)))?;

        info!("Started pure-onnx-ocr worker for {}", language);
        Ok(Box::new(PureOnnxWorker {
            engine: Some(engine),
            pages: 0,
        }))
    }
}

struct PureOnnxWorker {
    engine: Option<pure_onnx_ocr::engine::OcrEngine>,
    pages: u32,
}

#[async_trait(?Send)]
impl RecognitionWorker for PureOnnxWorker {
    async fn recognize(&mut self, image: &[u8]) -> Result<String, RecognitionError> {
        let engine = self
            .engine
            .as_ref()
            .ok_or_else(|| RecognitionError::Failed("worker already terminated".to_string()))?;

        let start = Instant::now();
        let image = image::load_from_memory(image)
            .map_err(|e| RecognitionError::Failed(format!("undecodable page image: {}", e)))?;

        let results = engine
            .run_from_image(&image)
            .map_err(|e| classify_engine_error(e.to_string()))?;

        let mut lines: Vec<(f32, f32, String)> = results
            .iter()
            .map(|r| {
                let (left, top) = polygon_origin(&r.bounding_box);
                (top, left, r.text.replace("[UNK]", " "))
            })
            .collect();

        // Reading order: rows of ~20px top to bottom, then left to right.
        lines.sort_by(|a, b| {
            let row_a = (a.0 / 20.0) as i32;
            let row_b = (b.0 / 20.0) as i32;
            row_a
                .cmp(&row_b)
                .then(a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        });

        self.pages += 1;
        debug!(
            "pure-onnx-ocr: {} text regions in {}ms",
            lines.len(),
            start.elapsed().as_millis()
        );

        Ok(lines
            .into_iter()
            .map(|(_, _, text)| text)
            .filter(|text| !text.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn terminate(&mut self) {
        if self.engine.take().is_some() {
            debug!("pure-onnx-ocr worker terminated after {} pages", self.pages);
        }
    }
}

/// Engine errors mentioning allocation or memory end the run; anything else
/// only costs the current page.
fn classify_engine_error(message: String) -> RecognitionError {
    let lower = message.to_lowercase();
    if ["out of memory", "alloc", "memory", "bad_alloc"]
        .iter()
        .any(|needle| lower.contains(needle))
    {
        RecognitionError::ResourceExhausted(message)
    } else {
        RecognitionError::Failed(message)
    }
}

/// Top-left corner of a detected region.
fn polygon_origin(polygon: &pure_onnx_ocr::Polygon<f64>) -> (f32, f32) {
    polygon
        .exterior()
        .coords()
        .take(4)
        .fold((f32::INFINITY, f32::INFINITY), |(x, y), c| {
            (x.min(c.x as f32), y.min(c.y as f32))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_errors_are_fatal() {
        assert!(matches!(
            classify_engine_error("failed to allocate tensor buffer".into()),
            RecognitionError::ResourceExhausted(_)
        ));
        assert!(matches!(
            classify_engine_error("no text regions".into()),
            RecognitionError::Failed(_)
        ));
    }

    #[test]
    fn missing_models_are_a_load_failure() {
        let runtime = RuntimeConfig {
            model_dir: PathBuf::from("/nonexistent/docquiz-models"),
            ..RuntimeConfig::default()
        };
        let err = PureOnnxRecognizer::from_runtime(&runtime).err().unwrap();
        assert_eq!(err.kind(), crate::error::ErrorKind::LibraryLoadFailure);
    }
}
