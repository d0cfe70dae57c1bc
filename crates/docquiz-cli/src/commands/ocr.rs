//! OCR command - recognize every page of a PDF, ignoring its text layer.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use tracing::info;

use docquiz_core::{Failure, Pipeline};

use super::{
    OutputFormat, Report, cancel_on_ctrl_c, emit, load_config, missing_models_message,
    ocr_options, progress_bar, with_model_dir,
};

/// Arguments for the ocr command.
#[derive(Args)]
pub struct OcrArgs {
    /// Input PDF
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// OCR model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Recognition language(s), e.g. "vie+eng"
    #[arg(short, long)]
    language: Option<String>,

    /// Maximum number of pages to recognize
    #[arg(long)]
    max_pages: Option<u32>,

    /// Skip binarization
    #[arg(long)]
    no_binarize: bool,
}

pub async fn run(args: OcrArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = with_model_dir(load_config(config_path)?, args.model_dir.clone());
    if let Some(language) = &args.language {
        config.ocr.language = language.clone();
    }
    if let Some(max_pages) = args.max_pages {
        config.ocr.max_pages = max_pages;
    }
    if args.no_binarize {
        config.ocr.binarize = false;
    }

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let pipeline = Pipeline::init(&config)?;
    if !pipeline.has_ocr() {
        anyhow::bail!(missing_models_message(&config));
    }

    let data = fs::read(&args.input)?;
    info!(
        "Running OCR on {} (language {}, up to {} pages)",
        args.input.display(),
        config.ocr.language,
        config.ocr.max_pages
    );

    let pb = progress_bar("Starting OCR...")?;
    let options = ocr_options(&pb, cancel_on_ctrl_c());

    let report = match pipeline.extractor().open(&data).await {
        Ok(handle) => {
            let page_count = handle.page_count();
            match pipeline.ocr(handle, options).await {
                Ok(output) => Report::from_ocr(&args.input, output, page_count),
                Err(e) => Report::failure(&args.input, &Failure::from(e)),
            }
        }
        Err(failure) => Report::failure(&args.input, &failure),
    };

    pb.finish_and_clear();
    emit(&report.render(args.format)?, args.output.as_deref())?;
    report.conclude()
}
