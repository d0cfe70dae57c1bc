//! Extract command - pull quiz source text out of a single PDF.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use docquiz_core::{ExtractOptions, ExtractionResult, Failure, Pipeline};

use super::{
    OutputFormat, Report, cancel_on_ctrl_c, emit, load_config, ocr_options, progress_bar,
    progress_callback, with_model_dir,
};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input PDF
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Run OCR automatically when the document looks scanned
    #[arg(long)]
    ocr: bool,

    /// Ask on stdin before running OCR on a scanned document
    #[arg(long, conflicts_with = "ocr")]
    ask: bool,

    /// OCR model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = with_model_dir(load_config(config_path)?, args.model_dir.clone());

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let pipeline = Pipeline::init(&config)?;
    let data = fs::read(&args.input)?;
    info!("Extracting {} ({} bytes)", args.input.display(), data.len());

    let pb = progress_bar("Reading text layer...")?;
    let cancel = cancel_on_ctrl_c();

    let mut options = ExtractOptions::default().with_progress(progress_callback(&pb));
    if args.ocr {
        options = options.with_auto_ocr(ocr_options(&pb, cancel.clone()));
    }

    let report = match pipeline.extract(&data, options).await {
        ExtractionResult::ScannedDetected { handle } if args.ask => {
            let page_count = handle.page_count();
            if pb.suspend(|| confirm_ocr(page_count))? {
                pb.reset();
                match pipeline.ocr(handle, ocr_options(&pb, cancel)).await {
                    Ok(output) => Report::from_ocr(&args.input, output, page_count),
                    Err(e) => Report::failure(&args.input, &Failure::from(e)),
                }
            } else {
                Report::scanned(&args.input, page_count)
            }
        }
        result => Report::from_result(&args.input, result),
    };

    pb.finish_and_clear();

    emit(&report.render(args.format)?, args.output.as_deref())?;
    debug!("Total time: {:?}", start.elapsed());

    if report.status == super::Status::Text {
        if let Some(stats) = &report.stats {
            eprintln!(
                "{} {} characters from {} pages",
                style("ℹ").blue(),
                stats.text_chars,
                report.page_count.unwrap_or(0)
            );
        }
    }
    report.conclude()
}

/// Ask on stdin whether to run OCR.
fn confirm_ocr(page_count: u32) -> anyhow::Result<bool> {
    eprint!(
        "{} The document looks scanned. Run OCR on {} page(s)? [y/N] ",
        style("?").cyan(),
        page_count
    );
    io::stderr().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
