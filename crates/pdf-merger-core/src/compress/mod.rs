mod ghostscript;
mod traits;

pub use ghostscript::GhostscriptCompressor;
pub use traits::{Compressor, CompressorInfo};

use tracing::{info, warn};

use crate::config::{CompressionConfig, CompressionLevel};
use crate::error::Error;
use crate::pdf::MergedOutput;
use std::sync::Arc;

/// Create a compressor from configuration
pub fn create_compressor(config: &CompressionConfig) -> Arc<dyn Compressor> {
    Arc::new(GhostscriptCompressor::from_config(config))
}

/// Result of the best-effort compression step.
///
/// `output` is always usable: it is either the compressed document or the
/// original one. `notice` carries the reason when compression was attempted
/// but not applied.
#[derive(Debug)]
pub struct CompressionOutcome {
    pub output: MergedOutput,
    /// Whether `output` is the compressed version
    pub compressed: bool,
    pub notice: Option<Error>,
}

impl CompressionOutcome {
    const fn unchanged(output: MergedOutput, notice: Option<Error>) -> Self {
        Self {
            output,
            compressed: false,
            notice,
        }
    }
}

/// Compress `output` at `level`, falling back to the original on any error.
///
/// [`CompressionLevel::None`] returns the input untouched without calling
/// the compressor. With `keep_smaller`, a compressed result that is not
/// smaller than the input is discarded.
pub async fn compress_output(
    compressor: &dyn Compressor,
    output: MergedOutput,
    level: CompressionLevel,
    keep_smaller: bool,
) -> CompressionOutcome {
    if level.is_none() {
        return CompressionOutcome::unchanged(output, None);
    }

    match compressor.compress(output.bytes(), level).await {
        Ok(bytes) => {
            let before = output.size();
            let after = bytes.len() as u64;

            if keep_smaller && after >= before {
                info!(
                    "Discarding {} output at level {}: {} bytes is not smaller than {}",
                    compressor.name(),
                    level,
                    after,
                    before
                );
                return CompressionOutcome::unchanged(output, None);
            }

            info!(
                "Compressed with {} at level {}: {} -> {} bytes",
                compressor.name(),
                level,
                before,
                after
            );
            CompressionOutcome {
                output: output.with_bytes(bytes),
                compressed: true,
                notice: None,
            }
        }
        Err(e) => {
            warn!("Compression skipped, keeping merged output: {}", e);
            CompressionOutcome::unchanged(output, Some(e))
        }
    }
}
