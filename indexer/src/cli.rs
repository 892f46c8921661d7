//! CLI interface for the plugin indexer
//!
//! This module provides the command-line interface using clap's derive API.
//! There is a single command: index and package one plugin directory.

use crate::config::Config;
use clap::Parser;
use std::path::PathBuf;

/// Plugin Indexer
///
/// Finds the plugin library in a built plugin directory, writes its manifest
/// and packages every asset into a Brotli-compressed archive.
#[derive(Parser, Debug)]
#[command(name = "plugin-indexer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory containing the built plugin
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Specify alternate configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(
        long,
        value_name = "LEVEL",
        value_parser = ["error", "warn", "info", "debug", "trace"]
    )]
    pub log: Option<String>,

    /// Worker threads for hashing and compression (0 = one per compute unit)
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(level) = &self.log {
            config.core.log_level = level.clone();
        }
        if let Some(threads) = self.threads {
            config.core.threads = threads;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_cli_parsing() {
        // Verify CLI structure is valid
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_root_only() {
        let cli = Cli::parse_from(["plugin-indexer", "build/plugin"]);
        assert_eq!(cli.root, PathBuf::from("build/plugin"));
        assert!(cli.config.is_none());
        assert!(cli.log.is_none());
        assert!(cli.threads.is_none());
    }

    #[test]
    fn test_all_options() {
        let cli = Cli::parse_from([
            "plugin-indexer",
            "--config",
            "/etc/indexer.toml",
            "--log",
            "debug",
            "--threads",
            "2",
            "out",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/indexer.toml")));
        assert_eq!(cli.log.as_deref(), Some("debug"));
        assert_eq!(cli.threads, Some(2));
        assert_eq!(cli.root, PathBuf::from("out"));
    }

    #[test]
    fn test_missing_root_is_usage_error() {
        let error = Cli::try_parse_from(["plugin-indexer"]).expect_err("root is required");
        assert_eq!(error.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let result = Cli::try_parse_from(["plugin-indexer", "--log", "loud", "out"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from(["plugin-indexer", "--log", "trace", "--threads", "8", "out"]);
        let mut config = Config::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.core.log_level, "trace");
        assert_eq!(config.core.threads, 8);

        let cli = Cli::parse_from(["plugin-indexer", "out"]);
        let mut config = Config::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config, Config::default());
    }
}
