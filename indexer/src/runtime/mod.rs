//! Runtime module for probing native plugin modules
//!
//! - `native`: the foreign capability loader (load / resolve / unload)
//! - `capability`: the five-accessor view of a plugin object
//! - `probe`: decides whether one file is a plugin

pub mod capability;
pub mod native;
pub mod probe;

pub use capability::{AlternativeIcon, ComPlugin, PluginCapability, PluginMetadata};
pub use native::{CapabilityLoader, LoadError, LoadedModule, NativeLoader, NativeModule};
pub use probe::{LibraryProber, ProbeOutcome, ProbeRejection, ProbedPlugin};
