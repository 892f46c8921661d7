//! Platform-specific utilities
//!
//! Asset paths are stored root-relative with `/` separators on every
//! platform, which is also the separator ZIP entry names use. Only the
//! platform's own separators are treated as separators: a `\` inside a Unix
//! file name is part of the name.

use std::path::{Component, Path};

/// Canonical separator for asset paths
pub const ASSET_SEPARATOR: char = '/';

/// Root-relative asset path with `/` separators
///
/// Returns `None` when `path` is not under `root`, names `root` itself, or
/// has a component that is not valid UTF-8.
///
/// # Examples
///
/// ```
/// use plugin_indexer::platform::relative_asset_path;
/// use std::path::Path;
///
/// let root = Path::new("build");
/// let path = root.join("lang").join("en.json");
/// assert_eq!(relative_asset_path(root, &path).as_deref(), Some("lang/en.json"));
/// ```
pub fn relative_asset_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;

    let mut normalized = String::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                if !normalized.is_empty() {
                    normalized.push(ASSET_SEPARATOR);
                }
                normalized.push_str(part.to_str()?);
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    (!normalized.is_empty()).then_some(normalized)
}

/// Final path segment of an asset path
pub fn asset_file_name(asset_path: &str) -> &str {
    asset_path
        .rsplit(ASSET_SEPARATOR)
        .next()
        .unwrap_or(asset_path)
}

/// Asset file name without its last extension
///
/// ```
/// use plugin_indexer::platform::asset_file_stem;
///
/// assert_eq!(asset_file_stem("bin/Hi3Helper.Plugin.Wuwa.dll"), "Hi3Helper.Plugin.Wuwa");
/// assert_eq!(asset_file_stem("libplugin.so"), "libplugin");
/// assert_eq!(asset_file_stem(".hidden"), ".hidden");
/// ```
pub fn asset_file_stem(asset_path: &str) -> &str {
    let name = asset_file_name(asset_path);
    match name.rfind('.') {
        Some(0) | None => name,
        Some(dot) => &name[..dot],
    }
}
