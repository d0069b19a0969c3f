//! PDF Merger CLI - Command line tool for merging PDF documents.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_merger_core::{
    AppConfig, CompressionLevel, MergeStats, OrderedFileList, PdfMerger, UploadedFile,
    format_size,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum QualityOption {
    None,
    Low,
    Medium,
    High,
    Maximum,
}

impl From<QualityOption> for CompressionLevel {
    fn from(opt: QualityOption) -> Self {
        match opt {
            QualityOption::None => Self::None,
            QualityOption::Low => Self::Low,
            QualityOption::Medium => Self::Medium,
            QualityOption::High => Self::High,
            QualityOption::Maximum => Self::Maximum,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "pdf-merge")]
#[command(author, version, about = "Merge PDF documents into one file", long_about = None)]
struct Args {
    /// Input PDF files, merged in the given order
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output PDF file (default: merged_<timestamp>.pdf)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Merge order as 1-based positions of the inputs (e.g., "3,1,2")
    #[arg(long)]
    order: Option<String>,

    /// Compression level (default: from config)
    #[arg(short, long, value_enum)]
    quality: Option<QualityOption>,

    /// Ghostscript executable
    #[arg(long, env = "GHOSTSCRIPT_PATH")]
    gs_path: Option<PathBuf>,

    /// Seconds before compression is abandoned
    #[arg(long)]
    timeout: Option<u64>,

    /// Discard compressed output that is not smaller
    #[arg(long)]
    keep_smaller: bool,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print a JSON summary instead of text
    #[arg(long)]
    json: bool,
}

/// Machine-readable summary printed with `--json`
#[derive(Debug, Serialize)]
struct Summary<'a> {
    output: &'a Path,
    #[serde(flatten)]
    stats: &'a MergeStats,
    reduction_percent: f64,
    notice: Option<String>,
}

/// Parse a comma-separated list of 1-based positions into a permutation.
///
/// Every input must appear exactly once.
fn parse_order(order: &str, count: usize) -> Result<Vec<usize>> {
    let mut result = Vec::with_capacity(count);

    for part in order.split(',') {
        let part = part.trim();
        let position: usize = part
            .parse()
            .with_context(|| format!("Invalid position '{part}'"))?;
        if position == 0 || position > count {
            anyhow::bail!("Position {position} is out of range 1-{count}");
        }
        if result.contains(&(position - 1)) {
            anyhow::bail!("Position {position} appears more than once");
        }
        result.push(position - 1);
    }

    if result.len() != count {
        anyhow::bail!(
            "Order lists {} of {} inputs; every input must appear once",
            result.len(),
            count
        );
    }
    Ok(result)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging
    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    // Load or create config
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };

    // Override config with CLI arguments
    if let Some(gs_path) = args.gs_path {
        config.compression.ghostscript_path = gs_path;
    }
    if let Some(timeout) = args.timeout {
        config.compression.timeout_secs = timeout;
    }
    if args.keep_smaller {
        config.compression.keep_smaller = true;
    }
    config.validate().context("Invalid configuration")?;

    let level = args
        .quality
        .map_or(config.compression.default_level, CompressionLevel::from);

    let order = match &args.order {
        Some(order) => parse_order(order, args.inputs.len())?,
        None => (0..args.inputs.len()).collect(),
    };

    // Setup progress bar
    let pb = ProgressBar::new(args.inputs.len() as u64);
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    // Read inputs
    let mut files = OrderedFileList::new();
    for &index in &order {
        let path = &args.inputs[index];
        let name = file_name(path);
        pb.set_message(name.clone());

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read input: {}", path.display()))?;

        if files.contains_name(&name) {
            pb.println(format!("{name} appears twice, merging both copies"));
        }
        files
            .add(UploadedFile::new(name, bytes))
            .with_context(|| format!("Failed to add input: {}", path.display()))?;
        pb.inc(1);
    }
    pb.finish_and_clear();

    info!(
        "Merging {} files ({}) at compression level {}",
        files.len(),
        format_size(files.total_size()),
        level
    );

    let merger = PdfMerger::new(&config.compression);
    let report = merger
        .run(&files, level)
        .await
        .context("Failed to merge PDFs")?;

    if let Some(notice) = &report.notice {
        warn!("Compression not applied: {}", notice);
    }

    // Determine output path
    let output_path = args
        .output
        .unwrap_or_else(|| PathBuf::from(pdf_merger_core::util::default_output_name()));

    // Save output
    tokio::fs::write(&output_path, report.output.bytes())
        .await
        .with_context(|| format!("Failed to write output: {}", output_path.display()))?;

    let stats = &report.stats;

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        if args.json {
            let summary = Summary {
                output: &output_path,
                stats,
                reduction_percent: stats.reduction_percent(),
                notice: report.notice.as_ref().map(ToString::to_string),
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            println!("Merged PDF saved to: {}", output_path.display());
            println!("  Files:    {}", stats.files);
            println!("  Pages:    {}", stats.pages);
            println!("  Original: {}", format_size(stats.original_size));
            if stats.compressed {
                println!(
                    "  Final:    {} ({:.1}% smaller, level {})",
                    format_size(stats.final_size),
                    stats.reduction_percent(),
                    stats.level
                );
            } else {
                println!("  Final:    {}", format_size(stats.final_size));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_order_permutation() {
        assert_eq!(parse_order("3,1,2", 3).unwrap(), vec![2, 0, 1]);
        assert_eq!(parse_order(" 2 , 1 ", 2).unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_parse_order_rejects_bad_input() {
        assert!(parse_order("1,2", 3).is_err());
        assert!(parse_order("1,1,2", 3).is_err());
        assert!(parse_order("0,1", 2).is_err());
        assert!(parse_order("1,4,2", 3).is_err());
        assert!(parse_order("a,b", 2).is_err());
    }

    #[test]
    fn test_quality_maps_to_level() {
        assert_eq!(CompressionLevel::from(QualityOption::None), CompressionLevel::None);
        assert_eq!(
            CompressionLevel::from(QualityOption::Maximum),
            CompressionLevel::Maximum
        );
    }

    #[test]
    fn test_file_name_strips_directories() {
        assert_eq!(file_name(Path::new("/tmp/docs/report.pdf")), "report.pdf");
    }
}
