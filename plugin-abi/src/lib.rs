//! Plugin ABI
//!
//! Shared `#[repr(C)]` types and function signatures for the native plugin
//! surface consumed by the indexer. Plugin authors link this crate to export
//! a conformant module; the indexer links it to probe one.
//!
//! A conformant module exports exactly one symbol, [`API_EXPORT_SYMBOL`],
//! which resolves every other entry point by name:
//!
//! - [`GET_PLUGIN`] returns the plugin object ([`PluginObject`])
//! - [`GET_PLUGIN_VERSION`] returns the plugin's own [`NativeVersion`]
//! - [`GET_PLUGIN_STANDARD_VERSION`] returns the targeted host ABI version

/// Error types for decoding ABI values
pub mod errors;

/// Version records
pub mod version;

/// .NET-compatible timestamp records
pub mod datetime;

/// Export names, function signatures and the plugin object vtable
pub mod vtable;

/// NUL-terminated UTF-16 string helpers
pub mod wide;

pub use datetime::{DateTimeKind, NativeDateTime};
pub use errors::AbiError;
pub use version::NativeVersion;
pub use vtable::{
    GetDateFn, GetPluginFn, GetStringFn, GetVersionFn, HResult, PluginObject, PluginVtable,
    TryGetApiExportFn, API_EXPORT_SYMBOL, EXPORT_FOUND, GET_PLUGIN, GET_PLUGIN_STANDARD_VERSION,
    GET_PLUGIN_VERSION, S_OK,
};
pub use wide::{encode_wide, read_wide};
