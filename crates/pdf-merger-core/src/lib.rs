//! PDF Merger Core Library
//!
//! This library provides the core functionality for merging PDF documents:
//! - An ordered list of uploaded files with move, swap and remove
//! - Page-wise merging of the list into a single PDF
//! - Best-effort compression through an external tool (Ghostscript)
//! - A session context tying the steps together

pub mod compress;
pub mod config;
pub mod error;
pub mod files;
pub mod pdf;
pub mod session;
pub mod util;

pub use compress::{
    CompressionOutcome, Compressor, CompressorInfo, GhostscriptCompressor, compress_output,
    create_compressor,
};
pub use config::{
    AppConfig, CompressionConfig, CompressionLevel, CompressionOption, SessionConfig,
    compression_options,
};
pub use error::{Error, Result};
pub use files::{OrderedFileList, UploadedFile};
pub use pdf::{MergedOutput, PdfDocument, probe_page_count};
pub use session::{MergeJob, MergeSession, MergeSettings, SessionStage};
pub use util::{format_size, reduction_percent};

use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// High-level merger that combines merging and compression
pub struct PdfMerger {
    compressor: Arc<dyn Compressor>,
    config: CompressionConfig,
}

/// Figures describing one merge, shown to the user afterwards
#[derive(Debug, Clone, Serialize)]
pub struct MergeStats {
    /// Number of input files
    pub files: usize,
    /// Pages in the output
    pub pages: usize,
    /// Sum of input file sizes in bytes
    pub original_size: u64,
    /// Size of the delivered output in bytes
    pub final_size: u64,
    /// Requested compression level
    pub level: CompressionLevel,
    /// Whether the delivered output is the compressed version
    pub compressed: bool,
}

impl MergeStats {
    /// Size reduction relative to the inputs, in percent
    pub fn reduction_percent(&self) -> f64 {
        util::reduction_percent(self.original_size, self.final_size)
    }
}

/// Result of a full merge run
#[derive(Debug)]
pub struct MergeReport {
    pub output: MergedOutput,
    pub stats: MergeStats,
    /// Why compression was requested but not applied
    pub notice: Option<Error>,
}

impl PdfMerger {
    /// Create a merger using the configured compression tool
    pub fn new(config: &CompressionConfig) -> Self {
        Self {
            compressor: create_compressor(config),
            config: config.clone(),
        }
    }

    /// Create with a custom compressor
    pub fn with_compressor(compressor: Arc<dyn Compressor>, config: CompressionConfig) -> Self {
        Self { compressor, config }
    }

    /// Merge the files in list order.
    ///
    /// Parsing and serialization run on the blocking thread pool.
    pub async fn merge(&self, files: &OrderedFileList) -> Result<MergedOutput> {
        if files.is_empty() {
            return Err(Error::EmptyInput);
        }

        // O(1) per file - contents are reference-counted
        let files = files.clone();
        tokio::task::spawn_blocking(move || pdf::merge_files(&files))
            .await
            .map_err(|e| Error::MergeTask(e.to_string()))?
    }

    /// Compress a merged document, keeping the original on failure
    pub async fn compress(&self, output: MergedOutput, level: CompressionLevel) -> CompressionOutcome {
        compress_output(
            self.compressor.as_ref(),
            output,
            level,
            self.config.keep_smaller,
        )
        .await
    }

    /// Merge, then compress at `level`.
    ///
    /// Fails only if merging fails. A compression problem is reported in
    /// [`MergeReport::notice`] and the uncompressed output is returned.
    pub async fn run(&self, files: &OrderedFileList, level: CompressionLevel) -> Result<MergeReport> {
        let merged = self.merge(files).await?;

        info!(
            "Merged {} files into {} pages ({} bytes)",
            files.len(),
            merged.page_count(),
            merged.size()
        );

        let outcome = self.compress(merged, level).await;

        let stats = MergeStats {
            files: files.len(),
            pages: outcome.output.page_count(),
            original_size: files.total_size(),
            final_size: outcome.output.size(),
            level,
            compressed: outcome.compressed,
        };

        Ok(MergeReport {
            output: outcome.output,
            stats,
            notice: outcome.notice,
        })
    }

    /// Whether the compression backend can be used right now
    pub async fn compressor_available(&self) -> bool {
        self.compressor.is_available().await
    }

    pub fn compressor_info(&self) -> CompressorInfo {
        self.compressor.info()
    }

    pub const fn config(&self) -> &CompressionConfig {
        &self.config
    }
}
