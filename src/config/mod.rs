//! Configuration module for linesieve
//!
//! Settings for the buffers, the source stage and logging. A config file is
//! either TOML (`.toml` extension) or JSON (anything else). Every field has a
//! default, so a partial file is valid.
//!
//! # Config Location
//!
//! The default config file lives in the platform config directory:
//! - **Linux**: `~/.config/linesieve/config.toml`
//! - **macOS**: `~/Library/Application Support/linesieve/config.toml`
//! - **Windows**: `%APPDATA%\linesieve\config.toml`
//!
//! # Example
//!
//! ```ignore
//! use linesieve::config::AppConfig;
//!
//! let config = AppConfig::load("linesieve.toml")?;
//! let buffer = RawLineBuffer::from_config(&config.buffer);
//! ```

use crate::error::{LineSieveError, Result};
use crate::pipeline::STAGE_CHANNEL_CAPACITY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for config directories
pub const APP_ID: &str = "linesieve";

/// Default config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Default number of lines per page
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Default redraw coalescing period in milliseconds
pub const DEFAULT_REDRAW_INTERVAL_MS: u64 = 100;

/// Buffer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Maximum lines kept by the raw buffer (0 = unbounded)
    pub capacity: usize,

    /// Lines per page for paginated views
    pub page_size: usize,

    /// Capacity of stage output channels
    pub channel_capacity: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: 0,
            page_size: DEFAULT_PAGE_SIZE,
            channel_capacity: STAGE_CHANNEL_CAPACITY,
        }
    }
}

/// Source stage settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Split each record at the first NUL byte into display and output parts
    pub enable_sep: bool,

    /// How often pending redraw hints are flushed to the hub
    pub redraw_interval_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            enable_sep: false,
            redraw_interval_ms: DEFAULT_REDRAW_INTERVAL_MS,
        }
    }
}

impl SourceConfig {
    pub fn redraw_interval(&self) -> Duration {
        Duration::from_millis(self.redraw_interval_ms)
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,

    /// Write logs to this file instead of stderr
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            file: None,
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub buffer: BufferConfig,
    pub source: SourceConfig,
    pub logging: LoggingConfig,
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}

impl AppConfig {
    /// Default config file path, if the platform has a config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
    }

    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            LineSieveError::from(e).with_context(format!("Failed to read {}", path.display()))
        })?;

        let config: Self = if is_toml(path) {
            toml::from_str(&content)
                .map_err(|e| LineSieveError::Config(format!("Failed to parse config: {}", e)))?
        } else {
            serde_json::from_str(&content)
                .map_err(|e| LineSieveError::Config(format!("Failed to parse config: {}", e)))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Load from `path` (or the default location). On failure the defaults
    /// are returned together with the error, for the caller to report once
    /// logging is up. A missing default file is not an error.
    pub fn load_deferred(path: Option<&Path>) -> (Self, Option<LineSieveError>) {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) if p.exists() => p,
                _ => return (Self::default(), None),
            },
        };

        match Self::load(&path) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    /// Load from `path` (or the default location), returning defaults on any error
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let (config, err) = Self::load_deferred(path);
        if let Some(e) = err {
            tracing::warn!("Failed to load config, using defaults: {}", e);
        }
        config
    }

    /// Save the config, TOML or JSON depending on the extension
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_toml(path) {
            toml::to_string_pretty(self)
                .map_err(|e| LineSieveError::Serialization(e.to_string()))?
        } else {
            serde_json::to_string_pretty(self)
                .map_err(|e| LineSieveError::Serialization(e.to_string()))?
        };

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, content)
            .map_err(|e| LineSieveError::Config(format!("Failed to write config: {}", e)))
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.buffer.page_size == 0 {
            return Err(LineSieveError::Config(
                "buffer.page_size must be greater than 0".to_string(),
            ));
        }
        if self.source.redraw_interval_ms == 0 {
            return Err(LineSieveError::Config(
                "source.redraw_interval_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
