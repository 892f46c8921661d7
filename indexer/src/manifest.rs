//! Plugin manifest
//!
//! The manifest is the JSON document plugin hosts read to identify a plugin
//! package and verify its assets. Field names and their order are fixed by
//! the host, so the struct field order below is the wire order.
//!
//! ```json
//! {
//!   "MainLibraryName": "bin/plugin.dll",
//!   "MainPluginName": "Sample Plugin",
//!   "MainPluginAuthor": "Plugin Indexer Team",
//!   "MainPluginDescription": "...",
//!   "PluginStandardVersion": "0.1.0",
//!   "PluginVersion": "1.2.3",
//!   "PluginCreationDate": "2024-05-01T20:00:00+08:00",
//!   "ManifestDate": "2024-05-02T08:30:00Z",
//!   "PluginAlternativeIcon": "https://example.com/icons/sample.png",
//!   "Assets": [
//!     { "FilePath": "bin/plugin.dll", "Size": 1024, "FileHash": "1B2M2Y8AsgTpgAmY7PhCfg==" }
//!   ]
//! }
//! ```

use crate::error::IndexerError;
use crate::inventory::Digest;
use crate::platform::asset_file_stem;
use crate::runtime::ProbedPlugin;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, FixedOffset, Utc};
use semver::Version;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fs;
use std::path::Path;

/// One file of the plugin tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AssetRecord {
    /// Root-relative path with `/` separators
    pub file_path: String,
    /// Bytes hashed
    pub size: u64,
    /// Content digest; absent only for the manifest's own entry
    #[serde(with = "file_hash")]
    pub file_hash: Option<Digest>,
}

impl AssetRecord {
    pub fn new(file_path: impl Into<String>, size: u64, digest: Digest) -> Self {
        Self {
            file_path: file_path.into(),
            size,
            file_hash: Some(digest),
        }
    }

    /// The manifest's own entry: zero size, empty digest
    pub fn manifest_entry(file_name: impl Into<String>) -> Self {
        Self {
            file_path: file_name.into(),
            size: 0,
            file_hash: None,
        }
    }
}

/// Base64 of the raw digest bytes, `""` when there is no digest
mod file_hash {
    use super::*;

    pub fn serialize<S: Serializer>(digest: &Option<Digest>, serializer: S) -> Result<S::Ok, S::Error> {
        match digest {
            Some(digest) => serializer.serialize_str(&STANDARD.encode(digest.as_bytes())),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Digest>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        if encoded.is_empty() {
            return Ok(None);
        }

        let bytes = STANDARD.decode(&encoded).map_err(serde::de::Error::custom)?;
        let bytes: [u8; 16] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("FileHash must decode to 16 bytes"))?;
        Ok(Some(Digest::from_bytes(bytes)))
    }
}

/// The manifest document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PluginManifest {
    pub main_library_name: String,
    pub main_plugin_name: String,
    pub main_plugin_author: String,
    pub main_plugin_description: String,
    pub plugin_standard_version: Version,
    pub plugin_version: Version,
    pub plugin_creation_date: DateTime<FixedOffset>,
    pub manifest_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_alternative_icon: Option<String>,
    pub assets: Vec<AssetRecord>,
}

impl PluginManifest {
    /// Build the manifest for `plugin` over `assets`
    pub fn new(plugin: &ProbedPlugin, assets: Vec<AssetRecord>, manifest_date: DateTime<Utc>) -> Self {
        let metadata = &plugin.metadata;
        Self {
            main_library_name: plugin.library_name.clone(),
            main_plugin_name: metadata.name.clone(),
            main_plugin_author: metadata.author.clone(),
            main_plugin_description: metadata.description.clone(),
            plugin_standard_version: plugin.standard_version.to_semver(),
            plugin_version: plugin.plugin_version.to_semver(),
            plugin_creation_date: metadata.creation_date,
            manifest_date,
            plugin_alternative_icon: metadata
                .alternative_icon
                .as_ref()
                .map(|icon| icon.as_str().to_string()),
            assets,
        }
    }

    /// Serialize with 2-space indentation and `\n` newlines
    pub fn to_json(&self) -> Result<String, IndexerError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| IndexerError::Unexpected(format!("Failed to serialize manifest: {}", e)))
    }

    /// Write the manifest to `path`, replacing any previous file
    pub fn write_to(&self, path: &Path) -> Result<(), IndexerError> {
        let json = self.to_json()?;
        fs::write(path, json).map_err(IndexerError::io(format!("writing {}", path.display())))
    }

    /// Read a manifest back from `path`
    pub fn read_from(path: &Path) -> Result<Self, IndexerError> {
        let contents =
            fs::read_to_string(path).map_err(IndexerError::io(format!("reading {}", path.display())))?;
        serde_json::from_str(&contents).map_err(|e| {
            IndexerError::Unexpected(format!("Malformed manifest {}: {}", path.display(), e))
        })
    }

    /// `<library stem>_<version>_API-<standard version>_<YYYYMMDD>.<extension>`
    pub fn package_file_name(&self, extension: &str) -> String {
        format!(
            "{}_{}_API-{}_{}.{}",
            asset_file_stem(&self.main_library_name),
            self.plugin_version,
            self.plugin_standard_version,
            self.manifest_date.format("%Y%m%d"),
            extension
        )
    }
}
