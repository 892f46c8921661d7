//! Configuration management
//!
//! This module handles loading and validation of the indexer configuration.
//! Configuration is optional: without a file every setting takes its default,
//! which reproduces the packaging layout plugin hosts expect.
//!
//! # Lookup Order
//!
//! 1. The path passed with `--config`
//! 2. `<config dir>/plugin-indexer/config.toml` if it exists
//!    (`~/.config` on Linux, `~/Library/Application Support` on macOS,
//!    `%APPDATA%` on Windows)
//! 3. Built-in defaults
//!
//! # Configuration Sections
//!
//! - **core**: log level, worker thread count
//! - **inventory**: manifest file name, package extension, library extensions, hash chunk size
//! - **package**: Brotli quality and window
//!
//! # Examples
//!
//! ```no_run
//! use plugin_indexer::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load(None)?;
//! println!("Manifest: {}", config.inventory.manifest_file_name);
//! # Ok(())
//! # }
//! ```

use crate::error::IndexerError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Asset discovery settings
    #[serde(default)]
    pub inventory: InventoryConfig,

    /// Archive settings
    #[serde(default)]
    pub package: PackageConfig,
}

/// Core settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Worker threads for hashing and compression (0 = one per compute unit)
    #[serde(default)]
    pub threads: usize,
}

/// Asset discovery settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// Manifest file name, matched case-insensitively anywhere in the tree
    #[serde(default = "default_manifest_file_name")]
    pub manifest_file_name: String,

    /// Package extension without the dot; files ending with it are skipped
    #[serde(default = "default_package_extension")]
    pub package_extension: String,

    /// Extensions of files worth probing as a plugin library
    #[serde(default = "default_library_extensions")]
    pub library_extensions: Vec<String>,

    /// Read buffer size used while hashing, in bytes
    #[serde(default = "default_hash_chunk_size")]
    pub hash_chunk_size: usize,
}

/// Archive settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageConfig {
    /// Brotli quality (0-11)
    #[serde(default = "default_brotli_quality")]
    pub brotli_quality: u32,

    /// Brotli window size as log2 (10-24)
    #[serde(default = "default_brotli_window")]
    pub brotli_window: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_manifest_file_name() -> String {
    "manifest.json".to_string()
}

fn default_package_extension() -> String {
    "zip".to_string()
}

fn default_library_extensions() -> Vec<String> {
    ["dll", "exe", "so", "dylib"]
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

fn default_hash_chunk_size() -> usize {
    4 << 10
}

fn default_brotli_quality() -> u32 {
    11
}

fn default_brotli_window() -> u32 {
    22
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            threads: 0,
        }
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            manifest_file_name: default_manifest_file_name(),
            package_extension: default_package_extension(),
            library_extensions: default_library_extensions(),
            hash_chunk_size: default_hash_chunk_size(),
        }
    }
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            brotli_quality: default_brotli_quality(),
            brotli_window: default_brotli_window(),
        }
    }
}

impl InventoryConfig {
    /// Whether `file_name` is the manifest (case-insensitive)
    pub fn is_manifest(&self, file_name: &str) -> bool {
        file_name.eq_ignore_ascii_case(&self.manifest_file_name)
    }

    /// Whether `file_name` looks like a package produced by a previous run
    pub fn is_package(&self, file_name: &str) -> bool {
        ends_with_extension(file_name, &self.package_extension)
    }

    /// Whether `file_name` carries one of the allow-listed library extensions
    pub fn is_library_candidate(&self, file_name: &str) -> bool {
        self.library_extensions
            .iter()
            .any(|ext| ends_with_extension(file_name, ext))
    }
}

fn ends_with_extension(file_name: &str, ext: &str) -> bool {
    let Some(dot) = file_name.len().checked_sub(ext.len() + 1) else {
        return false;
    };
    let (Some(stem), Some(suffix)) = (file_name.get(..dot), file_name.get(dot..)) else {
        return false;
    };
    !stem.is_empty() && suffix.starts_with('.') && suffix[1..].eq_ignore_ascii_case(ext)
}

impl Config {
    /// Load configuration from `path`, or from the default location
    ///
    /// A missing default file is not an error; an explicit path that cannot
    /// be read is.
    ///
    /// # Errors
    ///
    /// Returns `IndexerError::Config` if the file cannot be read, fails to
    /// parse, or fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, IndexerError> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        match Self::default_config_path() {
            Some(default_path) if default_path.is_file() => Self::load_from_path(&default_path),
            _ => {
                tracing::debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, IndexerError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            IndexerError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config = Self::from_toml_str(&contents)?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, IndexerError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| IndexerError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;
        Ok(config)
    }

    /// `<config dir>/plugin-indexer/config.toml`
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("plugin-indexer").join("config.toml"))
    }

    /// Validate ranges and normalize extensions (strip leading dot, lower-case)
    fn validate_and_process(&mut self) -> Result<(), IndexerError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(IndexerError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if self.inventory.manifest_file_name.trim().is_empty() {
            return Err(IndexerError::Config(
                "manifest_file_name must not be empty".to_string(),
            ));
        }

        if self.inventory.hash_chunk_size == 0 {
            return Err(IndexerError::Config(
                "hash_chunk_size must be greater than 0".to_string(),
            ));
        }

        self.inventory.package_extension = normalize_extension(&self.inventory.package_extension);
        if self.inventory.package_extension.is_empty() {
            return Err(IndexerError::Config(
                "package_extension must not be empty".to_string(),
            ));
        }

        self.inventory.library_extensions = self
            .inventory
            .library_extensions
            .iter()
            .map(|ext| normalize_extension(ext))
            .filter(|ext| !ext.is_empty())
            .collect();
        if self.inventory.library_extensions.is_empty() {
            return Err(IndexerError::Config(
                "library_extensions must list at least one extension".to_string(),
            ));
        }

        if self.package.brotli_quality > 11 {
            return Err(IndexerError::Config(
                "brotli_quality must be between 0 and 11".to_string(),
            ));
        }

        if !(10..=24).contains(&self.package.brotli_window) {
            return Err(IndexerError::Config(
                "brotli_window must be between 10 and 24".to_string(),
            ));
        }

        Ok(())
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}
