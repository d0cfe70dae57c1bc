//! Batch command - extract text from many PDFs.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use docquiz_core::{CancellationToken, ExtractOptions, Pipeline};

use super::{
    OutputFormat, Report, Status, cancel_on_ctrl_c, load_config, missing_models_message,
    ocr_options, progress_callback, with_model_dir,
};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern for input PDFs
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Run OCR on scanned documents
    #[arg(long)]
    ocr: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    /// OCR model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = with_model_dir(load_config(config_path)?, args.model_dir.clone());

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let pipeline = Pipeline::init(&config)?;
    if args.ocr && !pipeline.has_ocr() {
        warn!(
            "{} Scanned documents will be reported, not recognized.",
            missing_models_message(&config)
        );
    }

    let multi_progress = MultiProgress::new();
    let overall_pb = multi_progress.add(ProgressBar::new(files.len() as u64));
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );
    let file_pb = multi_progress.add(ProgressBar::new(100));
    let cancel = cancel_on_ctrl_c();

    let mut reports = Vec::with_capacity(files.len());

    for path in files {
        if cancel.is_cancelled() {
            warn!("Interrupted, skipping remaining files");
            break;
        }
        file_pb.reset();
        file_pb.set_message(path.display().to_string());

        let report = process_file(&pipeline, &path, &args, &file_pb, &cancel).await;

        match report.status {
            Status::Text => {
                if let Some(output_dir) = &args.output_dir {
                    write_output(output_dir, &path, &report, args.format)?;
                }
            }
            Status::Scanned | Status::Cancelled => {
                debug!("{}: {}", path.display(), report.kind_label());
            }
            Status::Failed => {
                let message = report.message.as_deref().unwrap_or("unknown error");
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), message);
                } else {
                    error!("Failed to process {}: {}", path.display(), message);
                    anyhow::bail!("Processing failed: {}: {}", report.kind_label(), message);
                }
            }
        }

        reports.push(report);
        overall_pb.inc(1);
    }

    file_pb.finish_and_clear();
    overall_pb.finish_with_message("Complete");

    print_summary(&reports, start);
    Ok(())
}

async fn process_file(
    pipeline: &Pipeline,
    path: &Path,
    args: &BatchArgs,
    pb: &ProgressBar,
    cancel: &CancellationToken,
) -> Report {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            return Report::failure(
                path,
                &docquiz_core::Failure::new(docquiz_core::ErrorKind::Generic, e.to_string()),
            );
        }
    };

    let mut options = ExtractOptions::default().with_progress(progress_callback(pb));
    if args.ocr {
        options = options.with_auto_ocr(ocr_options(pb, cancel.clone()));
    }
    Report::from_result(path, pipeline.extract(&data, options).await)
}

fn write_output(
    output_dir: &Path,
    path: &Path,
    report: &Report,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let output_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    let output_path = output_dir.join(format!("{}.{}", output_name, format.extension()));

    fs::write(&output_path, report.render(format)?)?;
    debug!("Wrote output to {}", output_path.display());
    Ok(())
}

fn print_summary(reports: &[Report], start: Instant) {
    let mut by_kind: BTreeMap<&'static str, usize> = BTreeMap::new();
    for report in reports {
        *by_kind.entry(report.kind_label()).or_default() += 1;
    }
    let successful = reports.iter().filter(|r| r.status == Status::Text).count();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        reports.len(),
        start.elapsed()
    );
    println!(
        "   {} with text, {} without",
        style(successful).green(),
        style(reports.len() - successful).red()
    );
    for (kind, count) in &by_kind {
        println!("   {:<24} {}", kind, count);
    }

    let problems: Vec<_> = reports.iter().filter(|r| r.status != Status::Text).collect();
    if !problems.is_empty() {
        println!();
        println!("{}", style("Files without text:").red());
        for report in problems {
            println!(
                "  - {}: {}",
                report.file,
                report.message.as_deref().unwrap_or(report.kind_label())
            );
        }
    }
}
