//! Utility functions shared across the crate.

use std::path::PathBuf;

/// Get the user's config directory following XDG conventions.
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise `$HOME/.config`.
pub fn config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

/// Format a byte count as a human-readable size ("1.5 MB").
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let mut size = bytes as f64;
    for unit in UNITS {
        if size < 1024.0 {
            return format!("{size:.1} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1} TB")
}

/// Percentage by which `after` is smaller than `before`.
///
/// Negative when the output grew. Zero when either size is zero.
#[allow(clippy::cast_precision_loss)]
pub fn reduction_percent(before: u64, after: u64) -> f64 {
    if before == 0 || after == 0 {
        return 0.0;
    }
    (before as f64 - after as f64) / before as f64 * 100.0
}

/// Default name for a merged document, stamped with the local time.
pub fn default_output_name() -> String {
    format!("merged_{}.pdf", chrono::Local::now().format("%Y%m%d_%H%M%S"))
}

/// Clean up a user-supplied output filename.
///
/// Strips directory components and quotes, and appends `.pdf` when missing.
/// Returns `None` if nothing usable is left.
pub fn normalize_output_name(name: &str) -> Option<String> {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .replace(['"', '\r', '\n'], "");
    let base = base.trim();

    if base.is_empty() || base == "." || base == ".." {
        return None;
    }

    if base.to_lowercase().ends_with(".pdf") {
        Some(base.to_string())
    } else {
        Some(format!("{base}.pdf"))
    }
}
