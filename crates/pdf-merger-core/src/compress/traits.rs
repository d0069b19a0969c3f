use async_trait::async_trait;

use crate::config::CompressionLevel;
use crate::error::Result;

/// Information about a compression backend
#[derive(Debug, Clone)]
pub struct CompressorInfo {
    /// Human-readable name
    pub name: &'static str,
    /// Whether the backend runs an external program
    pub external: bool,
}

/// Trait for compression backends
///
/// Implementations receive a complete PDF and return a complete PDF. They
/// report a missing backend as [`crate::Error::CompressionUnavailable`] and
/// any other failure as [`crate::Error::CompressionFailed`].
#[async_trait]
pub trait Compressor: Send + Sync {
    /// Get information about this compressor
    fn info(&self) -> CompressorInfo;

    /// Get the compressor name (convenience method)
    fn name(&self) -> &'static str {
        self.info().name
    }

    /// Recompress a PDF at the given level.
    ///
    /// Never called with [`CompressionLevel::None`].
    async fn compress(&self, pdf: &[u8], level: CompressionLevel) -> Result<Vec<u8>>;

    /// Check whether the backend can currently be used
    async fn is_available(&self) -> bool {
        true
    }
}
