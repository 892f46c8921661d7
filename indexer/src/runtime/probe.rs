//! Library prober
//!
//! Decides whether one candidate file is a plugin. Every "this is not a
//! plugin" condition is a [`ProbeRejection`]: the caller logs it and moves
//! on. Only a module that passes the ABI checks and then breaks the
//! capability contract produces an error.
//!
//! # Probe Sequence
//!
//! 1. Load the module (failure → rejection)
//! 2. Find the exported `TryGetApiExport` resolver (missing → rejection)
//! 3. Resolve and call `GetPlugin` (unresolved or null → rejection)
//! 4. Resolve and call both version getters, copying each record out
//!    (unresolved or null → rejection)
//! 5. Read the plugin metadata (contract violation → fatal)
//!
//! The plugin object is released and the module unloaded on every path,
//! in that order.

use super::capability::{describe_plugin, ComPlugin, PluginMetadata};
use super::native::{CapabilityLoader, LoadedModule};
use crate::error::IndexerError;
use plugin_abi::{
    encode_wide, GetPluginFn, GetVersionFn, NativeVersion, TryGetApiExportFn, EXPORT_FOUND,
    GET_PLUGIN, GET_PLUGIN_STANDARD_VERSION, GET_PLUGIN_VERSION,
};
use std::ffi::c_void;
use std::fmt;
use std::path::Path;

/// Why a candidate is not a plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeRejection {
    LoadFailed(String),
    MissingResolver,
    UnresolvedExport(&'static str),
    NullPluginObject,
    NullVersion(&'static str),
}

impl fmt::Display for ProbeRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoadFailed(reason) => write!(f, "not a loadable module ({})", reason),
            Self::MissingResolver => write!(f, "does not export TryGetApiExport"),
            Self::UnresolvedExport(name) => write!(f, "cannot resolve {}", name),
            Self::NullPluginObject => write!(f, "GetPlugin returned no plugin object"),
            Self::NullVersion(name) => write!(f, "{} returned no version record", name),
        }
    }
}

/// A candidate that passed probing
#[derive(Debug, Clone, PartialEq)]
pub struct ProbedPlugin {
    /// Root-relative asset path of the library
    pub library_name: String,
    pub metadata: PluginMetadata,
    pub plugin_version: NativeVersion,
    pub standard_version: NativeVersion,
}

/// Result of probing one candidate
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Plugin(Box<ProbedPlugin>),
    Rejected(ProbeRejection),
}

/// Probes candidate files through a [`CapabilityLoader`]
pub struct LibraryProber<L> {
    loader: L,
}

impl<L: CapabilityLoader> LibraryProber<L> {
    pub fn new(loader: L) -> Self {
        Self { loader }
    }

    /// Probe the library at `path`, recorded in the manifest as `library_name`
    ///
    /// # Errors
    ///
    /// Returns `IndexerError::Capability` if the module is a plugin but its
    /// required metadata cannot be read.
    pub fn probe(&self, path: &Path, library_name: &str) -> Result<ProbeOutcome, IndexerError> {
        let module = match self.loader.load(path) {
            Ok(module) => module,
            Err(e) => return Ok(ProbeOutcome::Rejected(ProbeRejection::LoadFailed(e.reason))),
        };

        let outcome = probe_module(&module, library_name);
        drop(module);
        outcome
    }
}

fn probe_module<M: LoadedModule>(
    module: &M,
    library_name: &str,
) -> Result<ProbeOutcome, IndexerError> {
    let Some(resolver) = module.api_resolver() else {
        return Ok(ProbeOutcome::Rejected(ProbeRejection::MissingResolver));
    };

    let Some(get_plugin) = resolve_export(resolver, GET_PLUGIN) else {
        return Ok(ProbeOutcome::Rejected(ProbeRejection::UnresolvedExport(
            GET_PLUGIN,
        )));
    };
    let get_plugin: GetPluginFn = unsafe { std::mem::transmute(get_plugin) };

    let Some(plugin) = (unsafe { ComPlugin::from_raw(get_plugin(), module) }) else {
        return Ok(ProbeOutcome::Rejected(ProbeRejection::NullPluginObject));
    };

    let plugin_version = match read_version(resolver, GET_PLUGIN_VERSION) {
        Ok(version) => version,
        Err(rejection) => return Ok(ProbeOutcome::Rejected(rejection)),
    };
    let standard_version = match read_version(resolver, GET_PLUGIN_STANDARD_VERSION) {
        Ok(version) => version,
        Err(rejection) => return Ok(ProbeOutcome::Rejected(rejection)),
    };

    let metadata = describe_plugin(&plugin).map_err(|e| IndexerError::Capability {
        library: library_name.to_string(),
        reason: e.to_string(),
    })?;

    Ok(ProbeOutcome::Plugin(Box::new(ProbedPlugin {
        library_name: library_name.to_string(),
        metadata,
        plugin_version,
        standard_version,
    })))
}

/// Look up `name` through the module's resolver
fn resolve_export(resolver: TryGetApiExportFn, name: &str) -> Option<*mut c_void> {
    let wide_name = encode_wide(name);
    let mut export: *mut c_void = std::ptr::null_mut();
    let status = unsafe { resolver(wide_name.as_ptr(), &mut export) };

    if status != EXPORT_FOUND || export.is_null() {
        tracing::trace!("Resolver returned status {} for {}", status, name);
        return None;
    }
    Some(export)
}

/// Resolve a version getter, call it and copy the record by value
fn read_version(
    resolver: TryGetApiExportFn,
    name: &'static str,
) -> Result<NativeVersion, ProbeRejection> {
    let getter = resolve_export(resolver, name).ok_or(ProbeRejection::UnresolvedExport(name))?;
    let getter: GetVersionFn = unsafe { std::mem::transmute(getter) };

    let record = unsafe { getter() };
    if record.is_null() {
        return Err(ProbeRejection::NullVersion(name));
    }
    Ok(unsafe { *record })
}
