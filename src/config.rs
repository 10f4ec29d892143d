//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MBOXDEX_CONFIG` (environment variable)
//! 2. `~/.config/mboxdex/config.toml` (Linux/macOS)
//!    `%APPDATA%\mboxdex\config.toml` (Windows)
//! 3. Built-in defaults
//!
//! A config file that exists but does not parse is reported by the caller
//! once logging is up, and the defaults are used.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::index::IndexOptions;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Indexing settings.
    pub index: IndexConfig,
    /// Result pager settings.
    pub pager: PagerConfig,
    /// Column widths and caching for display.
    pub display: DisplayConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Indexing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Read buffer size in bytes (default: 1048576 = 1 MB).
    pub read_buffer_size: usize,
    /// Log a progress line every N messages (0 = never).
    pub progress_interval: u64,
}

/// Result pager settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PagerConfig {
    /// Results per page on startup.
    pub page_size: usize,
    /// Smallest page size reachable with `-`.
    pub min_page_size: usize,
    /// Largest page size reachable with `+`.
    pub max_page_size: usize,
    /// How much `+` / `-` change the page size.
    pub page_step: usize,
    /// Use ANSI colors.
    pub color: bool,
}

/// Column widths and caching for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Date column width.
    pub date_width: usize,
    /// Sender column width.
    pub sender_width: usize,
    /// Subject column width.
    pub subject_width: usize,
    /// Number of decoded messages kept in the LRU cache.
    pub cache_size: usize,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        let defaults = IndexOptions::default();
        Self {
            read_buffer_size: defaults.read_buffer_size,
            progress_interval: defaults.progress_interval,
        }
    }
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            min_page_size: 5,
            max_page_size: 100,
            page_step: 5,
            color: true,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            date_width: 30,
            sender_width: 35,
            subject_width: 50,
            cache_size: 50,
        }
    }
}

impl IndexConfig {
    pub fn options(&self) -> IndexOptions {
        IndexOptions {
            read_buffer_size: self.read_buffer_size,
            progress_interval: self.progress_interval,
        }
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the defaults if no file exists. A file that cannot be read or
/// parsed is an error; the caller decides whether to fall back.
pub fn load_config() -> anyhow::Result<Config> {
    match config_file_path() {
        Some(path) if path.exists() => read_config(&path),
        _ => Ok(Config::default()),
    }
}

/// Read and parse one config file.
pub fn read_config(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let cfg = toml::from_str::<Config>(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    tracing::info!(path = %path.display(), "Loaded config");
    Ok(cfg)
}

/// Save configuration to the standard location.
pub fn save_config(config: &Config) -> anyhow::Result<()> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(&path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MBOXDEX_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("mboxdex").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mboxdex")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("mboxdex.log")
}
