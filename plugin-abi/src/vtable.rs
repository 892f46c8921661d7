//! Export names, entry point signatures and the plugin object layout
//!
//! The plugin object follows the COM convention: its first word points to a
//! vtable that starts with the three `IUnknown` slots. Only the accessors the
//! indexer reads are modelled after them; the host contract defines more,
//! which is why [`PluginVtable`] is never constructed by value on the
//! consumer side, only read through a pointer.

use crate::datetime::NativeDateTime;
use crate::version::NativeVersion;
use std::ffi::c_void;

/// COM-style status code, zero on success
pub type HResult = i32;

pub const S_OK: HResult = 0;

/// Status returned by the capability resolver when a name is found
pub const EXPORT_FOUND: i32 = 0;

/// The one symbol a conformant module exports
pub const API_EXPORT_SYMBOL: &[u8] = b"TryGetApiExport\0";

/// Names resolved through [`TryGetApiExportFn`]
pub const GET_PLUGIN: &str = "GetPlugin";
pub const GET_PLUGIN_VERSION: &str = "GetPluginVersion";
pub const GET_PLUGIN_STANDARD_VERSION: &str = "GetPluginStandardVersion";

/// `(name, out) -> status` where `name` is NUL-terminated UTF-16
pub type TryGetApiExportFn =
    unsafe extern "C" fn(name: *const u16, out: *mut *mut c_void) -> i32;

/// Returns the plugin object, or null when the module has none
pub type GetPluginFn = unsafe extern "C" fn() -> *mut c_void;

/// Returns a pointer valid only until the next call into the module
pub type GetVersionFn = unsafe extern "C" fn() -> *const NativeVersion;

pub type QueryInterfaceFn =
    unsafe extern "system" fn(this: *mut c_void, iid: *const c_void, out: *mut *mut c_void) -> HResult;
pub type RefCountFn = unsafe extern "system" fn(this: *mut c_void) -> u32;

/// Writes a plugin-owned NUL-terminated UTF-16 string (or null) to `out`
pub type GetStringFn = unsafe extern "system" fn(this: *mut c_void, out: *mut *const u16) -> HResult;

/// Writes a pointer to a plugin-owned timestamp to `out`
pub type GetDateFn =
    unsafe extern "system" fn(this: *mut c_void, out: *mut *const NativeDateTime) -> HResult;

/// Leading slots of the plugin object's vtable
#[repr(C)]
pub struct PluginVtable {
    pub query_interface: QueryInterfaceFn,
    pub add_ref: RefCountFn,
    pub release: RefCountFn,
    pub get_plugin_name: GetStringFn,
    pub get_plugin_description: GetStringFn,
    pub get_plugin_author: GetStringFn,
    pub get_plugin_creation_date: GetDateFn,
    pub get_plugin_app_icon_url: GetStringFn,
}

/// Header of every plugin object
#[repr(C)]
pub struct PluginObject {
    pub vtable: *const PluginVtable,
}
