//! Foreign capability loader
//!
//! Loading a candidate module is modelled as an ordinary fallible operation:
//! a file that is not a loadable library yields a [`LoadError`], never a
//! crash. The loaded module is owned by a guard; dropping the guard unloads
//! it, so every exit path out of a probe releases the module.
//!
//! # Platform-Specific Loading
//!
//! [`NativeLoader`] uses `libloading`, which maps to `dlopen`/`dlsym` on Unix
//! and `LoadLibraryExW`/`GetProcAddress` on Windows. A module built for
//! another platform simply fails to load.
//!
//! # Examples
//!
//! ```no_run
//! use plugin_indexer::runtime::{CapabilityLoader, LoadedModule, NativeLoader};
//! use std::path::Path;
//!
//! let loader = NativeLoader::new();
//! match loader.load(Path::new("build/plugin.dll")) {
//!     Ok(module) => println!("resolver exported: {}", module.api_resolver().is_some()),
//!     Err(e) => println!("not a loadable library: {}", e),
//! }
//! ```

use plugin_abi::{TryGetApiExportFn, API_EXPORT_SYMBOL};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A candidate could not be loaded as a native module
#[derive(Debug, Error)]
#[error("failed to load {path:?}: {reason}")]
pub struct LoadError {
    pub path: PathBuf,
    pub reason: String,
}

/// Loads candidate modules
///
/// Implementations must be shareable across the worker threads of the
/// discovery pass.
pub trait CapabilityLoader: Send + Sync {
    type Module: LoadedModule;

    /// Load `path`; the returned guard unloads the module on drop
    fn load(&self, path: &Path) -> Result<Self::Module, LoadError>;
}

/// A loaded module
pub trait LoadedModule {
    /// The module's exported capability resolver, if it has one
    ///
    /// The function pointer is only valid while `self` is alive.
    fn api_resolver(&self) -> Option<TryGetApiExportFn>;
}

/// `libloading`-backed loader for shared libraries on disk
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeLoader;

impl NativeLoader {
    pub fn new() -> Self {
        Self
    }
}

/// A shared library loaded by [`NativeLoader`]
pub struct NativeModule {
    library: libloading::Library,
    path: PathBuf,
}

impl CapabilityLoader for NativeLoader {
    type Module = NativeModule;

    fn load(&self, path: &Path) -> Result<NativeModule, LoadError> {
        // Loading runs the module's initializers; that is inherent to probing.
        let library = unsafe { libloading::Library::new(path) }.map_err(|e| LoadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        tracing::trace!("Loaded module {}", path.display());
        Ok(NativeModule {
            library,
            path: path.to_path_buf(),
        })
    }
}

impl LoadedModule for NativeModule {
    fn api_resolver(&self) -> Option<TryGetApiExportFn> {
        // `Option<fn>` keeps a null export address from becoming a dangling fn pointer.
        let symbol: libloading::Symbol<Option<TryGetApiExportFn>> =
            match unsafe { self.library.get(API_EXPORT_SYMBOL) } {
                Ok(symbol) => symbol,
                Err(e) => {
                    tracing::trace!("No capability resolver in {}: {}", self.path.display(), e);
                    return None;
                }
            };
        *symbol
    }
}

impl Drop for NativeModule {
    fn drop(&mut self) {
        tracing::trace!("Unloading module {}", self.path.display());
    }
}
