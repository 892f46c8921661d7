//! Error types and exit status mapping
//!
//! Every run-fatal condition is an [`IndexerError`]. Candidates that merely
//! fail to be a plugin are not errors at all; they are reported as
//! [`crate::runtime::probe::ProbeRejection`] values and skipped.
//!
//! # Exit Status
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | success |
//! | 1 | no valid plugin found |
//! | 2 | root path not found |
//! | 64 | usage error |
//! | 65 | asset path is not valid UTF-8 |
//! | 74 | I/O failure without a platform error code |
//! | 78 | invalid configuration |
//! | 255 | unexpected fault |
//!
//! I/O failures that carry a platform error code in `1..=255` surface that
//! code directly, unless it collides with one of the codes above (EPERM and
//! ENOENT are 1 and 2 on Unix); those exit with 74.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub mod exit_code {
    pub const SUCCESS: u8 = 0;
    pub const NO_PLUGIN: u8 = 1;
    pub const ROOT_NOT_FOUND: u8 = 2;
    pub const USAGE: u8 = 64;
    pub const DATA_ERROR: u8 = 65;
    pub const IO_ERROR: u8 = 74;
    pub const CONFIG: u8 = 78;
    pub const UNEXPECTED: u8 = 255;

    /// Codes with a fixed meaning that platform error codes must not reuse
    pub(crate) const RESERVED: [u8; 7] = [
        SUCCESS,
        NO_PLUGIN,
        ROOT_NOT_FOUND,
        USAGE,
        DATA_ERROR,
        CONFIG,
        UNEXPECTED,
    ];
}

/// Extra context carried by indexer errors
pub trait IndexerErrorExt {
    /// Short, user-facing advice for the error
    fn user_hint(&self) -> &str;

    /// Process exit status for the error
    fn exit_code(&self) -> u8;
}

/// Run-fatal indexer errors
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("Path is not a directory or it doesn't exist: {0:?}")]
    RootNotFound(PathBuf),

    #[error("No valid plugin library was found")]
    NoPluginFound,

    #[error("Asset path is not valid UTF-8: {0:?}")]
    InvalidAssetPath(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Plugin {library} violated its capability contract: {reason}")]
    Capability { library: String, reason: String },

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl IndexerError {
    /// `map_err` adapter attaching what was being done when I/O failed
    pub fn io(context: impl Into<String>) -> impl FnOnce(io::Error) -> Self {
        let context = context.into();
        move |source| Self::Io { context, source }
    }
}

fn os_exit_code(error: &io::Error) -> u8 {
    error
        .raw_os_error()
        .and_then(|code| u8::try_from(code).ok())
        .filter(|code| !exit_code::RESERVED.contains(code))
        .unwrap_or(exit_code::IO_ERROR)
}

impl IndexerErrorExt for IndexerError {
    fn user_hint(&self) -> &str {
        match self {
            Self::RootNotFound(_) => "Pass the directory that contains the built plugin",
            Self::NoPluginFound => {
                "No file in the directory exports TryGetApiExport with the required entry points"
            }
            Self::InvalidAssetPath(_) => "Rename the file so its path is valid UTF-8",
            Self::Config(_) => "Check the indexer config.toml for errors",
            Self::Io { .. } => "File system operation failed. Outputs left on disk are incomplete",
            Self::Archive(_) => "Package could not be written. Outputs left on disk are incomplete",
            Self::Capability { .. } => "The plugin returned malformed metadata",
            Self::Unexpected(_) => "This is a bug in the indexer",
        }
    }

    fn exit_code(&self) -> u8 {
        match self {
            Self::RootNotFound(_) => exit_code::ROOT_NOT_FOUND,
            Self::NoPluginFound => exit_code::NO_PLUGIN,
            Self::InvalidAssetPath(_) => exit_code::DATA_ERROR,
            Self::Config(_) => exit_code::CONFIG,
            Self::Io { source, .. } => os_exit_code(source),
            Self::Archive(zip::result::ZipError::Io(source)) => os_exit_code(source),
            Self::Archive(_) => exit_code::IO_ERROR,
            Self::Capability { .. } | Self::Unexpected(_) => exit_code::UNEXPECTED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorized_exit_codes_are_distinct() {
        let codes = [
            IndexerError::RootNotFound(PathBuf::from("missing")).exit_code(),
            IndexerError::NoPluginFound.exit_code(),
            IndexerError::Config("bad".to_string()).exit_code(),
            IndexerError::InvalidAssetPath(PathBuf::from("data.bin")).exit_code(),
            IndexerError::Unexpected("boom".to_string()).exit_code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            assert_ne!(*a, exit_code::SUCCESS);
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_io_error_surfaces_platform_code() {
        let error = IndexerError::io("writing manifest")(io::Error::from_raw_os_error(28));
        assert_eq!(error.exit_code(), 28);
        assert!(error.to_string().contains("writing manifest"));
    }

    #[test]
    fn test_platform_code_never_reuses_a_categorized_code() {
        for code in exit_code::RESERVED {
            let error = IndexerError::io("reading")(io::Error::from_raw_os_error(i32::from(code)));
            assert_eq!(error.exit_code(), exit_code::IO_ERROR, "os error {code}");
        }

        let enoent = IndexerError::from(zip::result::ZipError::Io(io::Error::from_raw_os_error(2)));
        assert_eq!(enoent.exit_code(), exit_code::IO_ERROR);
    }

    #[test]
    fn test_io_error_without_platform_code() {
        let error = IndexerError::io("compressing")(io::Error::new(io::ErrorKind::Other, "x"));
        assert_eq!(error.exit_code(), exit_code::IO_ERROR);
    }

    #[test]
    fn test_archive_error_codes() {
        let wrapped = IndexerError::from(zip::result::ZipError::Io(io::Error::from_raw_os_error(5)));
        assert_eq!(wrapped.exit_code(), 5);

        let invalid = IndexerError::from(zip::result::ZipError::FileNotFound);
        assert_eq!(invalid.exit_code(), exit_code::IO_ERROR);
    }

    #[test]
    fn test_capability_error_is_unexpected() {
        let error = IndexerError::Capability {
            library: "plugin.dll".to_string(),
            reason: "GetPluginName returned 0x80004005".to_string(),
        };
        assert_eq!(error.exit_code(), exit_code::UNEXPECTED);
        assert!(!error.user_hint().is_empty());
    }
}
