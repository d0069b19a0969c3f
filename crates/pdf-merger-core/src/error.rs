use thiserror::Error;

/// Unified error type for pdf-merger-core
///
/// This enum encompasses all error cases that can occur in the library:
/// - File list operations (adding, reordering, removing)
/// - Merge operations (parsing inputs, saving the merged document)
/// - Compression through an external tool
/// - Configuration loading
/// - General I/O operations
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // File List Errors
    // ==========================================================================
    /// An uploaded file was rejected before it entered the list
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A list position outside `0..len` was requested
    #[error("index {index} out of range (list has {len} files)")]
    IndexOutOfRange { index: usize, len: usize },

    // ==========================================================================
    // Merge Errors
    // ==========================================================================
    /// Merge was requested with no files
    #[error("no files to merge")]
    EmptyInput,

    /// One of the inputs could not be read as a PDF
    #[error("'{name}' is not a valid PDF: {reason}")]
    CorruptInput { name: String, reason: String },

    /// Failed to serialize the merged document
    #[error("failed to save PDF: {0}")]
    PdfSave(String),

    /// The background merge task did not finish
    #[error("merge task failed: {0}")]
    MergeTask(String),

    // ==========================================================================
    // Compression Errors
    // ==========================================================================
    /// The compression tool is not installed or could not be started
    #[error("compression unavailable: {0}")]
    CompressionUnavailable(String),

    /// The compression tool ran but did not produce a usable PDF
    #[error("compression failed: {0}")]
    CompressionFailed(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error came from the compression step.
    ///
    /// Compression errors never abort a merge: the uncompressed output is
    /// kept and the error is reported alongside it.
    pub const fn is_compression(&self) -> bool {
        matches!(
            self,
            Self::CompressionUnavailable(_) | Self::CompressionFailed(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
