//! Per-user merge session.
//!
//! A [`MergeSession`] owns everything one user works with: the file list,
//! the chosen settings and the latest merge result. Front ends keep one per
//! user and pass it to each operation; nothing here is process-wide.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle -> FilesLoaded -> Merged -> (Compressed) -> Downloaded
//!                   \-> Failed
//! ```
//!
//! Editing the file list discards any merge result or failure and returns
//! to `FilesLoaded` (or `Idle` once the list is empty).

use crate::config::CompressionLevel;
use crate::error::{Error, Result};
use crate::files::{OrderedFileList, UploadedFile};
use crate::pdf::MergedOutput;
use crate::util::{default_output_name, normalize_output_name};
use crate::{MergeReport, PdfMerger};

/// Where a session is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStage {
    Idle,
    FilesLoaded,
    Merged,
    Compressed,
    Downloaded,
    /// The last merge failed; holds the user-facing reason
    Failed(String),
}

impl SessionStage {
    pub const fn has_output(&self) -> bool {
        matches!(self, Self::Merged | Self::Compressed | Self::Downloaded)
    }
}

/// User-chosen options for the next merge
#[derive(Debug, Clone)]
pub struct MergeSettings {
    pub compression: CompressionLevel,
    output_name: String,
}

impl MergeSettings {
    pub fn new(compression: CompressionLevel) -> Self {
        Self {
            compression,
            output_name: default_output_name(),
        }
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    /// Set the download filename, normalised to a bare `*.pdf` name.
    pub fn set_output_name(&mut self, name: &str) -> Result<()> {
        let name = normalize_output_name(name)
            .ok_or_else(|| Error::InvalidInput(format!("'{name}' is not a usable file name")))?;
        self.output_name = name;
        Ok(())
    }
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self::new(CompressionLevel::default())
    }
}

/// Snapshot of what to merge, taken so the merge can run without holding
/// on to the session
#[derive(Debug, Clone)]
pub struct MergeJob {
    pub files: OrderedFileList,
    pub compression: CompressionLevel,
}

/// Session-scoped merge context
#[derive(Debug)]
pub struct MergeSession {
    files: OrderedFileList,
    settings: MergeSettings,
    stage: SessionStage,
    report: Option<MergeReport>,
}

impl MergeSession {
    pub fn new(compression: CompressionLevel) -> Self {
        Self {
            files: OrderedFileList::new(),
            settings: MergeSettings::new(compression),
            stage: SessionStage::Idle,
            report: None,
        }
    }

    pub const fn files(&self) -> &OrderedFileList {
        &self.files
    }

    pub const fn settings(&self) -> &MergeSettings {
        &self.settings
    }

    pub const fn stage(&self) -> &SessionStage {
        &self.stage
    }

    /// Latest successful merge, if it has not been discarded
    pub const fn report(&self) -> Option<&MergeReport> {
        self.report.as_ref()
    }

    // =========================================================================
    // File list editing
    // =========================================================================

    pub fn add_file(&mut self, file: UploadedFile) -> Result<usize> {
        let index = self.files.add(file)?;
        self.discard_output();
        Ok(index)
    }

    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        self.files.reorder(from, to)?;
        self.discard_output();
        Ok(())
    }

    pub fn swap(&mut self, a: usize, b: usize) -> Result<()> {
        self.files.swap(a, b)?;
        self.discard_output();
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<UploadedFile> {
        let file = self.files.remove(index)?;
        self.discard_output();
        Ok(file)
    }

    // =========================================================================
    // Settings
    // =========================================================================

    pub const fn set_compression(&mut self, level: CompressionLevel) {
        self.settings.compression = level;
    }

    pub fn set_output_name(&mut self, name: &str) -> Result<()> {
        self.settings.set_output_name(name)
    }

    // =========================================================================
    // Merging
    // =========================================================================

    /// Snapshot the files and settings for a merge.
    ///
    /// Fails with [`Error::EmptyInput`] without touching the session.
    pub fn prepare_merge(&self) -> Result<MergeJob> {
        if self.files.is_empty() {
            return Err(Error::EmptyInput);
        }
        Ok(MergeJob {
            files: self.files.clone(),
            compression: self.settings.compression,
        })
    }

    /// Record the result of a merge started with [`Self::prepare_merge`].
    pub fn complete_merge(&mut self, result: Result<MergeReport>) -> Result<&MergeReport> {
        match result {
            Ok(report) => {
                self.stage = if report.stats.compressed {
                    SessionStage::Compressed
                } else {
                    SessionStage::Merged
                };
                Ok(&*self.report.insert(report))
            }
            Err(e) => {
                self.report = None;
                self.stage = SessionStage::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Merge and compress the current list in one step.
    pub async fn merge_with(&mut self, merger: &PdfMerger) -> Result<&MergeReport> {
        let job = self.prepare_merge()?;
        let result = merger.run(&job.files, job.compression).await;
        self.complete_merge(result)
    }

    /// Hand out the merged document and its filename.
    ///
    /// The output stays available for repeated downloads.
    pub fn download(&mut self) -> Option<(MergedOutput, String)> {
        let output = self.report.as_ref()?.output.clone();
        self.stage = SessionStage::Downloaded;
        Some((output, self.settings.output_name.clone()))
    }

    /// Drop the merge result but keep the files ("New Merge").
    pub fn start_over(&mut self) {
        self.discard_output();
    }

    /// Back to an empty session with a fresh output name ("Clear All").
    ///
    /// The compression choice is kept.
    pub fn reset(&mut self) {
        self.files.clear();
        self.settings = MergeSettings::new(self.settings.compression);
        self.discard_output();
    }

    fn discard_output(&mut self) {
        self.report = None;
        self.stage = if self.files.is_empty() {
            SessionStage::Idle
        } else {
            SessionStage::FilesLoaded
        };
    }
}

impl Default for MergeSession {
    fn default() -> Self {
        Self::new(CompressionLevel::default())
    }
}
