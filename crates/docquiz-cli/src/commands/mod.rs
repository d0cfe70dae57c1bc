//! Subcommand implementations and the pieces they share.

pub mod batch;
pub mod config;
pub mod extract;
pub mod ocr;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::warn;

use docquiz_core::pdf::ExtractionStats;
use docquiz_core::{
    CancellationToken, DocquizConfig, ErrorKind, ExtractionResult, Failure, OcrOutput,
    OcrProgress, OcrRunOptions, ProgressCallback,
};

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON report
    Json,
    /// Extracted text only
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Text => "txt",
        }
    }
}

/// Load configuration from `path`, else the user config file, else defaults.
pub fn load_config(path: Option<&str>) -> anyhow::Result<DocquizConfig> {
    if let Some(path) = path {
        return Ok(DocquizConfig::from_file(Path::new(path))?);
    }
    let user_config = config::default_config_path();
    if user_config.exists() {
        Ok(DocquizConfig::from_file(&user_config)?)
    } else {
        Ok(DocquizConfig::default())
    }
}

/// Explain where the OCR models were looked for and where to get them.
pub fn missing_models_message(config: &DocquizConfig) -> String {
    let mut message = format!(
        "OCR models not found in {}. Pass --model-dir or set runtime.model_dir.",
        config.runtime.model_dir.display()
    );
    if let Some(url) = &config.runtime.asset_base_url {
        message.push_str(&format!(" Models can be downloaded from {url}."));
    }
    message
}

/// Apply a `--model-dir` override.
pub fn with_model_dir(mut config: DocquizConfig, model_dir: Option<PathBuf>) -> DocquizConfig {
    if let Some(dir) = model_dir {
        config.runtime.model_dir = dir;
    }
    config
}

pub fn progress_bar(message: &str) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>3}% {msg}")?
            .progress_chars("##-"),
    );
    pb.set_message(message.to_string());
    Ok(pb)
}

pub fn progress_callback(pb: &ProgressBar) -> ProgressCallback {
    let pb = pb.clone();
    Arc::new(move |percent: u8| pb.set_position(u64::from(percent)))
}

/// Cancellation token tripped by Ctrl-C.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current page");
            signal.cancel();
        }
    });
    token
}

/// OCR options reporting to `pb`.
pub fn ocr_options(pb: &ProgressBar, cancel: CancellationToken) -> OcrRunOptions {
    let bar = pb.clone();
    OcrRunOptions {
        on_state: Some(Arc::new(move |state: &OcrProgress| {
            bar.set_message(format!(
                "OCR page {}/{}",
                state.pages_processed, state.total_pages
            ));
        })),
        ..OcrRunOptions::default()
    }
    .with_progress(progress_callback(pb))
    .with_cancel(cancel)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Text,
    Scanned,
    Failed,
    Cancelled,
}

/// What happened to one input file.
#[derive(Debug, Serialize)]
pub struct Report {
    pub file: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<ExtractionStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Report {
    fn new(file: &Path, status: Status) -> Self {
        Self {
            file: file.display().to_string(),
            status,
            kind: None,
            message: None,
            page_count: None,
            stats: None,
            text: None,
        }
    }

    /// Report for an extraction result. A scanned result drops its handle.
    pub fn from_result(file: &Path, result: ExtractionResult) -> Self {
        match result {
            ExtractionResult::Text {
                content,
                page_count,
                stats,
            } => Self {
                page_count: Some(page_count),
                stats: Some(stats),
                text: Some(content),
                ..Self::new(file, Status::Text)
            },
            ExtractionResult::ScannedDetected { handle } => Self::scanned(file, handle.page_count()),
            ExtractionResult::Failure(failure) => Self::failure(file, &failure),
        }
    }

    pub fn scanned(file: &Path, page_count: u32) -> Self {
        Self {
            kind: Some(ErrorKind::ScannedDetected),
            message: Some("the document has no text layer; run with --ocr".to_string()),
            page_count: Some(page_count),
            ..Self::new(file, Status::Scanned)
        }
    }

    pub fn failure(file: &Path, failure: &Failure) -> Self {
        let status = if failure.kind.is_user_cancellation() {
            Status::Cancelled
        } else {
            Status::Failed
        };
        Self {
            kind: Some(failure.kind),
            message: Some(failure.message.clone()),
            ..Self::new(file, status)
        }
    }

    pub fn from_ocr(file: &Path, output: OcrOutput, page_count: u32) -> Self {
        if output.truncated {
            warn!(
                "{}: only the first {} of {} pages were recognized",
                file.display(),
                output.total_pages,
                page_count
            );
        }
        Self {
            page_count: Some(page_count),
            stats: Some(ExtractionStats::from_ocr(&output)),
            text: Some(output.text),
            ..Self::new(file, Status::Text)
        }
    }

    pub fn render(&self, format: OutputFormat) -> anyhow::Result<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            OutputFormat::Text => Ok(match (&self.text, &self.message) {
                (Some(text), _) => text.clone(),
                (None, Some(message)) => format!("{}: {}", self.kind_label(), message),
                (None, None) => self.kind_label().to_string(),
            }),
        }
    }

    pub fn kind_label(&self) -> &'static str {
        self.kind.map_or("ok", ErrorKind::as_str)
    }

    /// Print a one-line verdict on stderr and fail for anything but text or
    /// a user cancellation.
    pub fn conclude(&self) -> anyhow::Result<()> {
        match self.status {
            Status::Text => Ok(()),
            Status::Cancelled => {
                eprintln!("{} OCR cancelled", style("⚠").yellow());
                Ok(())
            }
            Status::Scanned | Status::Failed => anyhow::bail!(
                "{}: {}",
                self.kind_label(),
                self.message.as_deref().unwrap_or("extraction failed")
            ),
        }
    }
}

/// Write `rendered` to `output`, or stdout when no path is given.
pub fn emit(rendered: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            fs::write(path, rendered)?;
            eprintln!(
                "{} Output written to {}",
                style("✓").green(),
                path.display()
            );
        }
        None => println!("{}", rendered),
    }
    Ok(())
}
