//! Ghostscript-backed compression.
//!
//! Ghostscript is run as a child process. The input and output live in a
//! temporary directory that is removed when compression returns, whatever
//! the outcome. Only the exit status of the process is interpreted.

use async_trait::async_trait;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::debug;

use super::traits::{Compressor, CompressorInfo};
use crate::config::{CompressionConfig, CompressionLevel};
use crate::error::{Error, Result};

/// How long `gs --version` may take before the tool is considered missing.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Compressor that shells out to Ghostscript's `pdfwrite` device.
#[derive(Debug, Clone)]
pub struct GhostscriptCompressor {
    program: PathBuf,
    timeout: Duration,
}

impl GhostscriptCompressor {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn from_config(config: &CompressionConfig) -> Self {
        Self::new(config.ghostscript_path.clone(), config.timeout())
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Command-line arguments for one compression run.
    pub fn arguments(dpi: u32, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-sDEVICE=pdfwrite".to_string(),
            "-dCompatibilityLevel=1.4".to_string(),
            "-dPDFSETTINGS=/ebook".to_string(),
            "-dNOPAUSE".to_string(),
            "-dQUIET".to_string(),
            "-dBATCH".to_string(),
            "-dDownsampleColorImages=true".to_string(),
            "-dDownsampleGrayImages=true".to_string(),
            "-dDownsampleMonoImages=true".to_string(),
            format!("-dColorImageResolution={dpi}"),
            format!("-dGrayImageResolution={dpi}"),
            format!("-dMonoImageResolution={dpi}"),
        ]
        .into_iter()
        .map(OsString::from)
        .collect();

        let mut output_arg = OsString::from("-sOutputFile=");
        output_arg.push(output);
        args.push(output_arg);
        args.push(input.as_os_str().to_owned());
        args
    }

    /// Version reported by `gs --version`, or `None` if it cannot be run.
    pub async fn version(&self) -> Option<String> {
        let mut command = Command::new(&self.program);
        command
            .arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(PROBE_TIMEOUT, command.output())
            .await
            .ok()?
            .ok()?;

        if !output.status.success() {
            return None;
        }

        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Some(version)
    }

    fn display_name(&self) -> String {
        self.program.display().to_string()
    }

    fn spawn_error(&self, e: &io::Error) -> Error {
        match e.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => Error::CompressionUnavailable(
                format!("{} could not be started: {e}", self.display_name()),
            ),
            _ => Error::CompressionFailed(format!(
                "failed to run {}: {e}",
                self.display_name()
            )),
        }
    }
}

impl Default for GhostscriptCompressor {
    fn default() -> Self {
        Self::from_config(&CompressionConfig::default())
    }
}

#[async_trait]
impl Compressor for GhostscriptCompressor {
    fn info(&self) -> CompressorInfo {
        CompressorInfo {
            name: "ghostscript",
            external: true,
        }
    }

    async fn compress(&self, pdf: &[u8], level: CompressionLevel) -> Result<Vec<u8>> {
        let Some(dpi) = level.image_resolution() else {
            return Ok(pdf.to_vec());
        };

        // Removed on drop, including every early return below
        let workdir = TempDir::new()
            .map_err(|e| Error::CompressionFailed(format!("failed to create temp dir: {e}")))?;
        let input = workdir.path().join("input.pdf");
        let output = workdir.path().join("output.pdf");

        tokio::fs::write(&input, pdf)
            .await
            .map_err(|e| Error::CompressionFailed(format!("failed to stage input: {e}")))?;

        debug!(
            "Running {} at {} dpi on {} bytes",
            self.display_name(),
            dpi,
            pdf.len()
        );

        let child = Command::new(&self.program)
            .args(Self::arguments(dpi, &input, &output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(&e))?;

        // Dropping the wait future on timeout drops the child, which kills it
        let result = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                Error::CompressionFailed(format!(
                    "{} timed out after {}s",
                    self.display_name(),
                    self.timeout.as_secs_f32()
                ))
            })?
            .map_err(|e| {
                Error::CompressionFailed(format!(
                    "failed waiting for {}: {e}",
                    self.display_name()
                ))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            debug!("{} stderr: {}", self.display_name(), stderr.trim());
            return Err(Error::CompressionFailed(format!(
                "{} exited with code {}",
                self.display_name(),
                result
                    .status
                    .code()
                    .map_or_else(|| "unknown".to_string(), |c| c.to_string())
            )));
        }

        let bytes = tokio::fs::read(&output).await.map_err(|e| {
            Error::CompressionFailed(format!("no output file was produced: {e}"))
        })?;

        tokio::task::spawn_blocking(move || validate_output(bytes))
            .await
            .map_err(|e| Error::CompressionFailed(format!("output validation panicked: {e}")))?
    }

    async fn is_available(&self) -> bool {
        self.version().await.is_some()
    }
}

/// Reject empty or unparseable tool output.
fn validate_output(bytes: Vec<u8>) -> Result<Vec<u8>> {
    if bytes.is_empty() {
        return Err(Error::CompressionFailed(
            "compressed output is empty".to_string(),
        ));
    }

    lopdf::Document::load_mem(&bytes).map_err(|e| {
        Error::CompressionFailed(format!("compressed output is not a valid PDF: {e}"))
    })?;

    Ok(bytes)
}
