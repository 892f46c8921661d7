//! Command handlers
//!
//! [`handle_index`] runs the whole packaging pipeline for one plugin
//! directory:
//!
//! 1. Inventory: hash every asset and probe library candidates
//! 2. Manifest: write `manifest.json` describing the plugin and its assets
//! 3. Package: compress every asset plus the manifest into the archive
//!
//! It is synchronous and CPU-bound; the binary runs it on a blocking task.
//! Progress is printed to stdout as line-oriented status text, diagnostics
//! go through `tracing`.

use crate::config::Config;
use crate::error::IndexerError;
use crate::inventory::InventoryBuilder;
use crate::manifest::{AssetRecord, PluginManifest};
use crate::package::{PackageBuilder, PackageSummary};
use crate::runtime::{CapabilityLoader, ProbedPlugin};
use chrono::Utc;
use rayon::ThreadPool;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Outputs of a successful run
#[derive(Debug, Clone)]
pub struct IndexReport {
    pub library_name: String,
    pub manifest_path: PathBuf,
    /// Assets hashed, not counting the manifest's own entry
    pub asset_count: usize,
    pub package: PackageSummary,
}

/// Index and package the plugin under `root`
///
/// # Errors
///
/// - `RootNotFound` if `root` is not a directory
/// - `NoPluginFound` if no candidate passes probing; nothing is written
/// - any run-fatal I/O, capability or archive error
pub fn handle_index<L: CapabilityLoader>(
    root: &Path,
    config: &Config,
    loader: L,
) -> Result<IndexReport, IndexerError> {
    if !root.is_dir() {
        return Err(IndexerError::RootNotFound(root.to_path_buf()));
    }

    let pool = build_pool(config.core.threads)?;
    tracing::debug!("Worker pool has {} threads", pool.current_num_threads());

    let inventory = InventoryBuilder::new(&config.inventory, loader).build(root, &pool)?;
    let Some(plugin) = inventory.plugin else {
        return Err(IndexerError::NoPluginFound);
    };
    print_plugin(&plugin);

    print!("Writing metadata info...");
    io::stdout().flush().ok();

    let asset_count = inventory.assets.len();
    let manifest = PluginManifest::new(&plugin, inventory.assets, Utc::now());
    let manifest_path = root.join(&config.inventory.manifest_file_name);
    manifest.write_to(&manifest_path)?;
    println!(" Done!");

    let archive_path = root.join(manifest.package_file_name(&config.inventory.package_extension));
    println!(
        "Writing output package in parallel using {} threads at: {}...",
        pool.current_num_threads(),
        archive_path.display()
    );

    let mut assets = manifest.assets;
    assets.push(AssetRecord::manifest_entry(
        config.inventory.manifest_file_name.as_str(),
    ));
    let package = PackageBuilder::new(&config.package).build(root, &archive_path, &assets, &pool)?;

    tracing::info!(
        "Packaged {} entries ({} bytes) into {}",
        package.entries,
        package.compressed_bytes,
        package.path.display()
    );

    Ok(IndexReport {
        library_name: plugin.library_name,
        manifest_path,
        asset_count,
        package,
    })
}

/// Worker pool for hashing, probing and compression (0 threads = one per compute unit)
fn build_pool(threads: usize) -> Result<ThreadPool, IndexerError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|index| format!("indexer-worker-{}", index))
        .build()
        .map_err(|e| IndexerError::Unexpected(format!("Failed to start worker pool: {}", e)))
}

fn print_plugin(plugin: &ProbedPlugin) {
    println!("Plugin has been found!");
    println!("  Main Library Path Name: {}", plugin.library_name);
    println!("  Main Plugin Name: {}", plugin.metadata.name);
    println!("  Creation Date: {}", plugin.metadata.creation_date.to_rfc3339());
    println!("  Version: {}", plugin.plugin_version);
}
