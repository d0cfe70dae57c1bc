//! Error types for the docquiz-core library.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure categories the surrounding application branches on.
///
/// The set is deliberately small: each kind maps to one remediation path
/// (unlock the file, pick another file, reload, run OCR, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Zero input bytes.
    EmptyFile,
    /// The document parsed but has no pages.
    EmptyDocument,
    /// The parser reported an encryption/password condition.
    PasswordProtected,
    /// Corrupt or non-PDF structure.
    InvalidFormat,
    /// Runtime assets of the parsing or recognition engine failed to load.
    LibraryLoadFailure,
    /// Not an error proper: the document needs an OCR decision.
    ScannedDetected,
    /// Text runs exist but normalize to almost nothing.
    EncodingFailure,
    /// A single page's text fetch exceeded its deadline.
    PageExtractionTimeout,
    /// OCR was cancelled by the user.
    OcrCancelled,
    /// OCR completed but recognized nothing.
    OcrNoTextRecognized,
    /// The recognition engine ran out of memory or hit a runtime fault.
    OcrResourceExhaustion,
    /// Anything else.
    Generic,
}

impl ErrorKind {
    /// Whether retrying the same file later may succeed.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::LibraryLoadFailure)
    }

    /// Whether this outcome should be shown as a cancelled state rather than
    /// an error.
    pub fn is_user_cancellation(self) -> bool {
        matches!(self, ErrorKind::OcrCancelled)
    }

    /// Stable snake_case name, as used in JSON output.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::EmptyFile => "empty_file",
            ErrorKind::EmptyDocument => "empty_document",
            ErrorKind::PasswordProtected => "password_protected",
            ErrorKind::InvalidFormat => "invalid_format",
            ErrorKind::LibraryLoadFailure => "library_load_failure",
            ErrorKind::ScannedDetected => "scanned_detected",
            ErrorKind::EncodingFailure => "encoding_failure",
            ErrorKind::PageExtractionTimeout => "page_extraction_timeout",
            ErrorKind::OcrCancelled => "ocr_cancelled",
            ErrorKind::OcrNoTextRecognized => "ocr_no_text_recognized",
            ErrorKind::OcrResourceExhaustion => "ocr_resource_exhaustion",
            ErrorKind::Generic => "generic",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure with a human-readable detail string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{kind}: {message}")]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Main error type for the docquiz library.
#[derive(Error, Debug)]
pub enum DocquizError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Generator output that is not a valid quiz.
    #[error("invalid quiz JSON: {0}")]
    Quiz(#[from] serde_json::Error),
}

impl DocquizError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DocquizError::Pdf(e) => e.kind(),
            DocquizError::Ocr(e) => e.kind(),
            DocquizError::Config(_)
            | DocquizError::Quiz(_)
            | DocquizError::Image(_)
            | DocquizError::Io(_) => ErrorKind::Generic,
        }
    }
}

/// Errors raised by a PDF backend.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Corrupt or non-PDF structure.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// The PDF is encrypted and cannot be opened without a password.
    #[error("PDF is password protected")]
    Encrypted,

    /// The backend's runtime assets could not be loaded.
    #[error("PDF engine failed to load: {0}")]
    LibraryLoad(String),

    /// Failed to extract text from a page.
    #[error("failed to extract text from page {page}: {reason}")]
    TextExtraction { page: u32, reason: String },

    /// A page's text fetch exceeded its deadline.
    #[error("text extraction timed out on page {0}")]
    PageTimeout(u32),

    /// Failed to rasterize a page.
    #[error("failed to render page {page}: {reason}")]
    Render { page: u32, reason: String },

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

impl PdfError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PdfError::Parse(_) => ErrorKind::InvalidFormat,
            PdfError::Encrypted => ErrorKind::PasswordProtected,
            PdfError::LibraryLoad(_) => ErrorKind::LibraryLoadFailure,
            PdfError::PageTimeout(_) => ErrorKind::PageExtractionTimeout,
            PdfError::TextExtraction { .. } | PdfError::Render { .. } | PdfError::InvalidPage(_) => {
                ErrorKind::Generic
            }
        }
    }
}

/// Errors reported by a recognition worker for a single image.
#[derive(Error, Debug, Clone)]
pub enum RecognitionError {
    /// Recognition of this image failed; other pages may still succeed.
    #[error("recognition failed: {0}")]
    Failed(String),

    /// The engine ran out of memory or hit a runtime fault.
    #[error("recognition engine exhausted: {0}")]
    ResourceExhausted(String),
}

/// Errors that end an OCR run.
#[derive(Error, Debug)]
pub enum OcrError {
    /// The recognition worker could not be created.
    #[error("failed to start recognition worker: {0}")]
    WorkerInit(String),

    /// The run was cancelled through its cancellation token.
    #[error("OCR cancelled after {pages_processed} of {total_pages} pages")]
    Cancelled { pages_processed: u32, total_pages: u32 },

    /// Every page was processed but no text came out.
    #[error("no text recognized in {0} pages")]
    NoTextRecognized(u32),

    /// The recognition engine signalled memory/runtime exhaustion.
    #[error("OCR aborted on page {page}: {reason}")]
    ResourceExhausted { page: u32, reason: String },

    /// Image preprocessing failed.
    #[error("preprocessing failed: {0}")]
    Preprocessing(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

impl OcrError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OcrError::WorkerInit(_) => ErrorKind::LibraryLoadFailure,
            OcrError::Cancelled { .. } => ErrorKind::OcrCancelled,
            OcrError::NoTextRecognized(_) => ErrorKind::OcrNoTextRecognized,
            OcrError::ResourceExhausted { .. } => ErrorKind::OcrResourceExhaustion,
            OcrError::Preprocessing(_) | OcrError::InvalidImage(_) => ErrorKind::Generic,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, OcrError::Cancelled { .. })
    }
}

impl From<PdfError> for Failure {
    fn from(e: PdfError) -> Self {
        Failure::new(e.kind(), e.to_string())
    }
}

impl From<OcrError> for Failure {
    fn from(e: OcrError) -> Self {
        Failure::new(e.kind(), e.to_string())
    }
}

/// Result type for the docquiz library.
pub type Result<T> = std::result::Result<T, DocquizError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn pdf_errors_map_to_remediation_kinds() {
        assert_eq!(PdfError::Encrypted.kind(), ErrorKind::PasswordProtected);
        assert_eq!(PdfError::Parse("bad xref".into()).kind(), ErrorKind::InvalidFormat);
        assert_eq!(
            PdfError::LibraryLoad("missing cmaps".into()).kind(),
            ErrorKind::LibraryLoadFailure
        );
        assert_eq!(PdfError::PageTimeout(3).kind(), ErrorKind::PageExtractionTimeout);
    }

    #[test]
    fn cancellation_is_not_an_error_state() {
        let err = OcrError::Cancelled {
            pages_processed: 2,
            total_pages: 9,
        };
        assert!(err.is_cancelled());
        assert!(err.kind().is_user_cancellation());
        assert!(!ErrorKind::OcrNoTextRecognized.is_user_cancellation());
    }

    #[test]
    fn only_library_load_is_retryable() {
        assert!(ErrorKind::LibraryLoadFailure.is_retryable());
        assert!(!ErrorKind::InvalidFormat.is_retryable());
        assert!(!ErrorKind::EncodingFailure.is_retryable());
    }

    #[test]
    fn bad_settings_are_not_retryable() {
        let err = DocquizError::Config("ocr.batch_size must be at least 1".into());
        assert_eq!(err.kind(), ErrorKind::Generic);
        assert!(!err.kind().is_retryable());
    }

    #[test]
    fn failure_serializes_kind_as_snake_case() {
        let failure = Failure::new(ErrorKind::EncodingFailure, "fonts unreadable");
        let json = serde_json::to_string(&failure).unwrap();
        assert_eq!(json, r#"{"kind":"encoding_failure","message":"fonts unreadable"}"#);
        assert_eq!(failure.to_string(), "encoding_failure: fonts unreadable");
    }
}
