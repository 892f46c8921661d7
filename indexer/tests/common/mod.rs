//! Shared fixtures for integration tests
//!
//! [`InProcessLoader`] stands in for the dynamic loader: a candidate "loads"
//! when its contents start with a registered marker, and the module it
//! yields exposes the resolver registered for that marker. The sample
//! plugin's real `TryGetApiExport` is linked in through its `rlib`, so every
//! probe still goes through the extern "C" ABI.

#![allow(dead_code)]

use plugin_abi::TryGetApiExportFn;
use plugin_indexer::runtime::{CapabilityLoader, LoadError, LoadedModule};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Contents prefix of files that load as the sample plugin
pub const SAMPLE_MARKER: &[u8] = b"\x7fSAMPLE-PLUGIN";

/// Contents prefix of files that load but export no resolver
pub const NO_RESOLVER_MARKER: &[u8] = b"\x7fNO-RESOLVER";

pub struct InProcessLoader {
    modules: Vec<(&'static [u8], Option<TryGetApiExportFn>)>,
}

pub struct InProcessModule {
    resolver: Option<TryGetApiExportFn>,
}

impl InProcessLoader {
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    /// Loader that knows the sample plugin and a resolver-less module
    pub fn sample() -> Self {
        Self::new()
            .with(SAMPLE_MARKER, Some(sample_plugin::TryGetApiExport))
            .with(NO_RESOLVER_MARKER, None)
    }

    pub fn with(mut self, marker: &'static [u8], resolver: Option<TryGetApiExportFn>) -> Self {
        self.modules.push((marker, resolver));
        self
    }
}

impl CapabilityLoader for InProcessLoader {
    type Module = InProcessModule;

    fn load(&self, path: &Path) -> Result<InProcessModule, LoadError> {
        let contents = fs::read(path).map_err(|e| LoadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        self.modules
            .iter()
            .find(|(marker, _)| contents.starts_with(marker))
            .map(|(_, resolver)| InProcessModule {
                resolver: *resolver,
            })
            .ok_or_else(|| LoadError {
                path: path.to_path_buf(),
                reason: "invalid module header".to_string(),
            })
    }
}

impl LoadedModule for InProcessModule {
    fn api_resolver(&self) -> Option<TryGetApiExportFn> {
        self.resolver
    }
}

/// Platform file name of a compiled `cdylib`
///
/// `libsample_plugin.so` on Linux, `sample_plugin.dll` on Windows.
pub fn library_filename(name: &str) -> String {
    format!(
        "{}{}{}",
        std::env::consts::DLL_PREFIX,
        name,
        std::env::consts::DLL_SUFFIX
    )
}

/// Write `contents` to `root/relative`, creating parent directories
pub fn write_file(root: &Path, relative: &str, contents: &[u8]) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    fs::write(&path, contents).expect("Failed to write file");
    path
}

/// A sample-plugin library file with some trailing payload
pub fn sample_library(payload: &str) -> Vec<u8> {
    let mut contents = SAMPLE_MARKER.to_vec();
    contents.extend_from_slice(payload.as_bytes());
    contents
}

pub fn set_modified(path: &Path, time: SystemTime) {
    let file = OpenOptions::new()
        .write(true)
        .open(path)
        .expect("Failed to open file");
    file.set_modified(time).expect("Failed to set modification time");
}

/// 1970-01-02T00:00:00Z
pub fn time_1970() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(86_400)
}

/// 2200-01-01T00:00:00Z
pub fn time_2200() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(7_258_118_400)
}
