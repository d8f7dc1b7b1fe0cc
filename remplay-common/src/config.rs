//! Configuration loading and config file resolution
//!
//! The daemon and the control client share one TOML file. Every key has a
//! built-in default, so a missing or partial file never prevents startup.
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `REMPLAY_CONFIG` environment variable
//! 3. Platform config directory (`~/.config/remplay/config.toml` on Linux)

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{Error, Result};

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "REMPLAY_CONFIG";

/// Upper bound for playback speed.
pub const MAX_SPEED: f32 = 1000.0;

/// Upper bound for volume.
pub const MAX_VOLUME: f32 = 1.0;

/// Traversal order of the main list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MainMode {
    /// Sequential with wrap-around
    #[default]
    Default,
    /// Uniform random pick per track
    FullRandom,
}

/// Ordering applied to a newly injected temp list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TempMode {
    /// Played in received order
    #[default]
    Sequential,
    /// Shuffled once on injection
    RandomPick,
}

/// Audio backend implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// symphonia decoding + cpal output
    #[default]
    Cpal,
    /// Silent backend that only tracks time
    Null,
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpal" => Ok(Self::Cpal),
            "null" => Ok(Self::Null),
            other => Err(Error::Config(format!(
                "Unknown backend '{}' (expected 'cpal' or 'null')",
                other
            ))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpal => write!(f, "cpal"),
            Self::Null => write!(f, "null"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Player configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Control socket listen/connect address
    pub socket_ip: String,

    /// Control socket port
    pub socket_port: u16,

    /// Initial volume (0.0-1.0)
    pub volume: f32,

    /// Initial playback speed (0.0-1000.0, 1.0 = normal)
    pub speed: f32,

    /// Files and directories that make up the main list
    pub playlist: Vec<PathBuf>,

    /// Allowed file extensions, without leading dot
    pub formats: Vec<String>,

    /// Main list traversal mode
    pub main_mode: MainMode,

    /// Temp list ordering mode
    pub temp_mode: TempMode,

    /// Audio backend
    pub backend: BackendKind,

    /// Output device name (None = system default)
    pub device_name: Option<String>,

    /// Control loop tick interval in milliseconds
    pub tick_interval_ms: u64,

    /// Nominal track length used by the null backend
    pub null_track_secs: u64,

    /// Logging configuration
    pub logging: LoggingConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            socket_ip: "127.0.0.1".to_string(),
            socket_port: 5730,
            volume: 0.5,
            speed: 1.0,
            playlist: Vec::new(),
            formats: ["mp3", "ogg", "flac", "wav", "opus", "m4a", "aac"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            main_mode: MainMode::Default,
            temp_mode: TempMode::Sequential,
            backend: BackendKind::Cpal,
            device_name: None,
            tick_interval_ms: 10,
            null_track_secs: 180,
            logging: LoggingConfig::default(),
        }
    }
}

impl PlayerConfig {
    /// Parse configuration from TOML text and normalize it.
    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        let config: Self = toml::from_str(content)?;
        Ok(config.normalized())
    }

    /// Load configuration from a file.
    ///
    /// # Errors
    ///
    /// I/O errors reading the file, or [`Error::ConfigParse`] for invalid TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `ip:port` string for binding or connecting.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.socket_ip, self.socket_port)
    }

    /// Clamp numeric values into range and canonicalize formats.
    pub fn normalized(mut self) -> Self {
        if !self.volume.is_finite() {
            warn!("Invalid volume {}, using 0.5", self.volume);
            self.volume = 0.5;
        }
        if !self.speed.is_finite() {
            warn!("Invalid speed {}, using 1.0", self.speed);
            self.speed = 1.0;
        }
        self.volume = self.volume.clamp(0.0, MAX_VOLUME);
        self.speed = self.speed.clamp(0.0, MAX_SPEED);
        self.tick_interval_ms = self.tick_interval_ms.max(1);

        let mut formats: Vec<String> = self
            .formats
            .iter()
            .map(|f| f.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|f| !f.is_empty())
            .collect();
        formats.dedup();
        self.formats = formats;

        self
    }

    /// True if `path` has one of the allowed extensions (case-insensitive).
    pub fn is_allowed_format(&self, path: &Path) -> bool {
        has_allowed_extension(path, &self.formats)
    }
}

/// True if `path` has one of `formats` as its extension (case-insensitive).
pub fn has_allowed_extension(path: &Path, formats: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            formats.iter().any(|f| *f == ext)
        })
        .unwrap_or(false)
}

/// Resolves and loads the configuration file.
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Create a resolver with an optional `--config` override.
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Config file path following the priority order in the module docs.
    pub fn resolve_path(&self) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: Platform config directory
        default_config_path()
    }

    /// Load the resolved configuration.
    ///
    /// A missing file is not an error: defaults are used and written to the
    /// resolved path when possible. An unparseable file is an error.
    pub fn load(&self) -> Result<PlayerConfig> {
        let Some(path) = self.resolve_path() else {
            warn!("Could not determine config directory, using defaults");
            return Ok(PlayerConfig::default());
        };

        if path.exists() {
            info!("Loading configuration from {}", path.display());
            return PlayerConfig::load(&path);
        }

        warn!("Config file {} not found, using defaults", path.display());
        let config = PlayerConfig::default();
        match write_config(&config, &path) {
            Ok(()) => info!("Wrote default configuration to {}", path.display()),
            Err(e) => warn!("Could not write default configuration: {}", e),
        }
        Ok(config)
    }
}

/// Platform default config path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("remplay").join("config.toml"))
}

/// Write configuration atomically (temp file + rename).
pub fn write_config(config: &PlayerConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize configuration: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
