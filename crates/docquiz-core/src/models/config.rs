//! Configuration structures for the ingestion pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for the docquiz pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocquizConfig {
    /// Engine asset locations.
    pub runtime: RuntimeConfig,

    /// Text-layer extraction configuration.
    pub extraction: ExtractionConfig,

    /// OCR fallback configuration.
    pub ocr: OcrConfig,
}

/// Locations of the parsing and recognition engines' runtime assets.
///
/// Passed once to [`crate::Pipeline::init`]; nothing reads these from
/// ambient global state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Directory containing OCR model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,

    /// Where the model files can be downloaded; named when they are missing.
    pub asset_base_url: Option<String>,

    /// Font directory for a custom [`crate::pdf::PdfBackend`]. The lopdf
    /// backend reads embedded fonts only and ignores it.
    pub font_dir: Option<PathBuf>,

    /// Predefined CMap directory for a custom [`crate::pdf::PdfBackend`].
    /// The lopdf backend decodes through each font's ToUnicode map and
    /// ignores it.
    pub cmap_dir: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
            asset_base_url: None,
            font_dir: None,
            cmap_dir: None,
        }
    }
}

impl RuntimeConfig {
    /// Full path to a model file.
    pub fn model_path(&self, file_name: &str) -> PathBuf {
        self.model_dir.join(file_name)
    }
}

/// Text-layer extraction thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Minimum cleaned characters for a document to count as usable text.
    pub min_text_chars: usize,

    /// Below this many non-blank runs a low-yield document is a scan;
    /// at or above it the fonts are assumed unreadable.
    pub scanned_item_floor: usize,

    /// Deadline for fetching one page's text runs, in milliseconds.
    pub page_timeout_ms: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_text_chars: 20,
            scanned_item_floor: 10,
            page_timeout_ms: 5_000,
        }
    }
}

impl ExtractionConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout_ms)
    }
}

/// OCR fallback configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Safety cap on the number of pages sent through OCR.
    pub max_pages: u32,

    /// Pages per batch; the engine yields to the scheduler between batches.
    pub batch_size: u32,

    /// Render scale relative to the page's size in points.
    pub render_scale: f32,

    /// Recognition language(s), `+`-separated.
    pub language: String,

    /// Apply grayscale + threshold binarization before recognition.
    pub binarize: bool,

    /// Fraction of the page's average luma used as the black/white threshold.
    pub luma_factor: f32,

    /// Upper bound on either raster dimension, in pixels.
    pub max_render_dimension: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            max_pages: 70,
            batch_size: 5,
            render_scale: 1.5,
            language: "vie+eng".to_string(),
            binarize: true,
            luma_factor: 0.9,
            max_render_dimension: 4096,
        }
    }
}

impl OcrConfig {
    /// Individual language codes of [`OcrConfig::language`].
    pub fn languages(&self) -> Vec<&str> {
        self.language
            .split('+')
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect()
    }
}

impl DocquizConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_tuned_constants() {
        let config = DocquizConfig::default();
        assert_eq!(config.ocr.max_pages, 70);
        assert_eq!(config.ocr.batch_size, 5);
        assert_eq!(config.ocr.render_scale, 1.5);
        assert_eq!(config.ocr.luma_factor, 0.9);
        assert_eq!(config.extraction.page_timeout(), Duration::from_secs(5));
        assert_eq!(config.extraction.scanned_item_floor, 10);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: DocquizConfig =
            serde_json::from_str(r#"{"ocr": {"batch_size": 2}}"#).unwrap();
        assert_eq!(config.ocr.batch_size, 2);
        assert_eq!(config.ocr.max_pages, 70);
        assert_eq!(config.extraction, ExtractionConfig::default());
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = DocquizConfig::default();
        config.ocr.language = "eng".to_string();
        config.save(&path).unwrap();

        assert_eq!(DocquizConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn languages_split_on_plus() {
        let config = OcrConfig::default();
        assert_eq!(config.languages(), vec!["vie", "eng"]);
    }
}
