use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Compression tier applied to the merged document.
///
/// Each tier maps to the image resolution handed to the compression tool.
/// Higher tiers downsample harder and produce smaller files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    /// Keep the merged output as-is
    None,
    Low,
    #[default]
    Medium,
    High,
    Maximum,
}

impl CompressionLevel {
    /// All levels, in UI order.
    pub const ALL: [Self; 5] = [
        Self::None,
        Self::Low,
        Self::Medium,
        Self::High,
        Self::Maximum,
    ];

    /// Image resolution (dpi) passed to the compression tool.
    ///
    /// Returns `None` for [`CompressionLevel::None`], which never invokes the tool.
    pub const fn image_resolution(self) -> Option<u32> {
        match self {
            Self::None => None,
            Self::Low => Some(300),
            Self::Medium => Some(200),
            Self::High => Some(150),
            Self::Maximum => Some(72),
        }
    }

    pub const fn is_none(self) -> bool {
        matches!(self, Self::None)
    }

    /// Stable lowercase identifier (used in forms and config files)
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Maximum => "maximum",
        }
    }

    /// Human-readable label
    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "No compression",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Maximum => "Maximum",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "none" | "off" | "" => Some(Self::None),
            "low" => Some(Self::Low),
            "medium" | "med" => Some(Self::Medium),
            "high" => Some(Self::High),
            "maximum" | "max" => Some(Self::Maximum),
            _ => None,
        }
    }
}

impl std::fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compression tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    /// Ghostscript executable (name on `PATH` or absolute path)
    #[serde(default = "default_ghostscript_path")]
    pub ghostscript_path: PathBuf,

    /// Seconds before a running compression is killed
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Level preselected for new sessions
    #[serde(default)]
    pub default_level: CompressionLevel,

    /// Discard compressed output that is not smaller than the input
    #[serde(default)]
    pub keep_smaller: bool,
}

fn default_ghostscript_path() -> PathBuf {
    PathBuf::from("gs")
}

const fn default_timeout_secs() -> u64 {
    60
}

impl CompressionConfig {
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            ghostscript_path: default_ghostscript_path(),
            timeout_secs: default_timeout_secs(),
            default_level: CompressionLevel::default(),
            keep_smaller: false,
        }
    }
}

/// Web session lifetime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Sessions older than this are discarded (seconds)
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,

    /// How often expired sessions are swept (seconds)
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

const fn default_max_age_secs() -> u64 {
    3600
}

const fn default_cleanup_interval_secs() -> u64 {
    5 * 60
}

impl SessionConfig {
    pub const fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }

    pub const fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_age_secs: default_max_age_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Compression tool configuration
    #[serde(default)]
    pub compression: CompressionConfig,

    /// Session lifetime configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Maximum request body size for uploads, in megabytes
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

const fn default_max_upload_mb() -> usize {
    300
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            compression: CompressionConfig::default(),
            session: SessionConfig::default(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::error::Error> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            crate::error::Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, crate::error::Error> {
        let config: Self = toml::from_str(content).map_err(|e| {
            crate::error::Error::ConfigLoad(format!("Failed to parse config: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the server unusable
    pub fn validate(&self) -> Result<(), crate::error::Error> {
        if self.compression.timeout_secs == 0 {
            return Err(crate::error::Error::ConfigInvalid {
                field: "compression.timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.max_upload_mb == 0 {
            return Err(crate::error::Error::ConfigInvalid {
                field: "max_upload_mb".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.session.max_age_secs == 0 {
            return Err(crate::error::Error::ConfigInvalid {
                field: "session.max_age_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        // Zero would make the sweeper spin on the session lock
        if self.session.cleanup_interval_secs == 0 {
            return Err(crate::error::Error::ConfigInvalid {
                field: "session.cleanup_interval_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Load from default locations (~/.config/pdf-merger/config.toml, ./config.toml)
    pub fn load() -> Self {
        // Try user config
        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("pdf-merger").join("config.toml");
            if user_config.exists() {
                match Self::from_file(&user_config) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {}", user_config.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // Try local config
        let local_config = std::path::PathBuf::from("config.toml");
        if local_config.exists() {
            match Self::from_file(&local_config) {
                Ok(config) => {
                    tracing::debug!("Loaded config from ./config.toml");
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load ./config.toml: {}", e);
                }
            }
        }

        tracing::debug!("No config file found, using defaults");
        Self::default()
    }
}

/// A compression option for UI dropdowns
#[derive(Debug, Clone)]
pub struct CompressionOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Compression options with `current` preselected.
pub fn compression_options(current: CompressionLevel) -> Vec<CompressionOption> {
    CompressionLevel::ALL
        .iter()
        .map(|&level| CompressionOption {
            value: level.as_str(),
            label: level.label(),
            selected: level == current,
        })
        .collect()
}
