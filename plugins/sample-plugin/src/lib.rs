//! Sample Plugin
//!
//! Smallest module that satisfies the plugin ABI. It exports only
//! `TryGetApiExport`; every other entry point is reached through it.
//!
//! Built as a `cdylib` for packaging tests against a real shared library and
//! as an `rlib` so test binaries can call the same entry points in-process.

use plugin_abi::{
    encode_wide, read_wide, DateTimeKind, HResult, NativeDateTime, NativeVersion, PluginObject,
    PluginVtable, EXPORT_FOUND, GET_PLUGIN, GET_PLUGIN_STANDARD_VERSION, GET_PLUGIN_VERSION, S_OK,
};
use std::ffi::c_void;
use std::sync::OnceLock;

pub const NAME: &str = "Sample Plugin";
pub const AUTHOR: &str = "Plugin Indexer Team";
pub const DESCRIPTION: &str = "Reference module for the plugin packaging ABI";
pub const ICON_URL: &str = "https://example.com/icons/sample.png";

pub const PLUGIN_VERSION: NativeVersion = NativeVersion::new(1, 2, 3);
pub const STANDARD_VERSION: NativeVersion = NativeVersion::new(0, 1, 0);

/// 2024-05-01T12:00:00Z
pub const CREATION_DATE: NativeDateTime =
    NativeDateTime::from_unix_seconds(1_714_564_800, DateTimeKind::Utc);

/// Status returned for names this module does not export
pub const EXPORT_NOT_FOUND: i32 = -1;

const E_NOINTERFACE: HResult = 0x8000_4002_u32 as i32;

static PLUGIN_VERSION_RECORD: NativeVersion = PLUGIN_VERSION;
static STANDARD_VERSION_RECORD: NativeVersion = STANDARD_VERSION;
static CREATION_DATE_RECORD: NativeDateTime = CREATION_DATE;

static VTABLE: PluginVtable = PluginVtable {
    query_interface,
    add_ref,
    release,
    get_plugin_name,
    get_plugin_description,
    get_plugin_author,
    get_plugin_creation_date,
    get_plugin_app_icon_url,
};

struct StaticPlugin(PluginObject);

// The object is immutable and its vtable is 'static.
unsafe impl Sync for StaticPlugin {}

static PLUGIN: StaticPlugin = StaticPlugin(PluginObject { vtable: &VTABLE });

fn wide(cell: &'static OnceLock<Vec<u16>>, value: &str) -> *const u16 {
    cell.get_or_init(|| encode_wide(value)).as_ptr()
}

/// Capability resolver
///
/// # Safety
///
/// `name` must be null or a NUL-terminated UTF-16 string and `out` must be
/// null or writable.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "C" fn TryGetApiExport(name: *const u16, out: *mut *mut c_void) -> i32 {
    if name.is_null() || out.is_null() {
        return EXPORT_NOT_FOUND;
    }

    let Ok(name) = read_wide(name) else {
        return EXPORT_NOT_FOUND;
    };

    let export: *mut c_void = match name.as_str() {
        GET_PLUGIN => get_plugin as *mut c_void,
        GET_PLUGIN_VERSION => get_plugin_version as *mut c_void,
        GET_PLUGIN_STANDARD_VERSION => get_plugin_standard_version as *mut c_void,
        _ => return EXPORT_NOT_FOUND,
    };

    *out = export;
    EXPORT_FOUND
}

unsafe extern "C" fn get_plugin() -> *mut c_void {
    &PLUGIN.0 as *const PluginObject as *mut c_void
}

unsafe extern "C" fn get_plugin_version() -> *const NativeVersion {
    &PLUGIN_VERSION_RECORD
}

unsafe extern "C" fn get_plugin_standard_version() -> *const NativeVersion {
    &STANDARD_VERSION_RECORD
}

unsafe extern "system" fn query_interface(
    _this: *mut c_void,
    _iid: *const c_void,
    out: *mut *mut c_void,
) -> HResult {
    if !out.is_null() {
        *out = std::ptr::null_mut();
    }
    E_NOINTERFACE
}

// Static object: reference counting is a no-op.
unsafe extern "system" fn add_ref(_this: *mut c_void) -> u32 {
    1
}

unsafe extern "system" fn release(_this: *mut c_void) -> u32 {
    1
}

unsafe extern "system" fn get_plugin_name(_this: *mut c_void, out: *mut *const u16) -> HResult {
    static CELL: OnceLock<Vec<u16>> = OnceLock::new();
    *out = wide(&CELL, NAME);
    S_OK
}

unsafe extern "system" fn get_plugin_description(
    _this: *mut c_void,
    out: *mut *const u16,
) -> HResult {
    static CELL: OnceLock<Vec<u16>> = OnceLock::new();
    *out = wide(&CELL, DESCRIPTION);
    S_OK
}

unsafe extern "system" fn get_plugin_author(_this: *mut c_void, out: *mut *const u16) -> HResult {
    static CELL: OnceLock<Vec<u16>> = OnceLock::new();
    *out = wide(&CELL, AUTHOR);
    S_OK
}

unsafe extern "system" fn get_plugin_creation_date(
    _this: *mut c_void,
    out: *mut *const NativeDateTime,
) -> HResult {
    *out = &CREATION_DATE_RECORD;
    S_OK
}

unsafe extern "system" fn get_plugin_app_icon_url(
    _this: *mut c_void,
    out: *mut *const u16,
) -> HResult {
    static CELL: OnceLock<Vec<u16>> = OnceLock::new();
    *out = wide(&CELL, ICON_URL);
    S_OK
}
