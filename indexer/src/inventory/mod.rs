//! Asset inventory
//!
//! Walks the plugin tree once, then hashes every file on the worker pool.
//! Files carrying a library extension are probed in the same task, so the
//! plugin library is found without a second pass.
//!
//! # Shared State
//!
//! Workers share two slots, each behind its own `Mutex`:
//!
//! - the asset list, appended to once per file
//! - the plugin winner
//!
//! Locks are taken only to read or swap a value. Hashing, probing and file
//! I/O always happen outside them.
//!
//! # Winner Selection
//!
//! Files are ranked by their asset path before the pool starts. When more
//! than one library passes probing, the lowest rank wins, so the result does
//! not depend on which worker finishes first. A worker skips probing when a
//! lower-ranked winner is already known.

mod digest;

pub use digest::{digest_file, Digest};

use crate::config::InventoryConfig;
use crate::error::IndexerError;
use crate::manifest::AssetRecord;
use crate::platform::{asset_file_name, relative_asset_path};
use crate::runtime::{CapabilityLoader, LibraryProber, ProbeOutcome, ProbedPlugin};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use walkdir::{DirEntry, WalkDir};

/// Result of the discovery pass
#[derive(Debug)]
pub struct Inventory {
    /// Every asset, sorted by path
    pub assets: Vec<AssetRecord>,
    /// The selected plugin library, if any file passed probing
    pub plugin: Option<ProbedPlugin>,
}

/// A file found by the walk
#[derive(Debug, Clone)]
struct AssetFile {
    path: PathBuf,
    asset_path: String,
    probe: bool,
}

#[derive(Debug)]
struct ProbeWinner {
    rank: usize,
    plugin: ProbedPlugin,
}

/// What happened when a probe success was offered to the winner slot
enum Offer {
    Taken { replaced: Option<String> },
    Discarded { kept: String },
}

/// Builds the asset inventory and finds the plugin library
pub struct InventoryBuilder<'c, L> {
    config: &'c InventoryConfig,
    prober: LibraryProber<L>,
}

impl<'c, L: CapabilityLoader> InventoryBuilder<'c, L> {
    pub fn new(config: &'c InventoryConfig, loader: L) -> Self {
        Self {
            config,
            prober: LibraryProber::new(loader),
        }
    }

    /// Hash every asset under `root` and probe library candidates on `pool`
    ///
    /// # Errors
    ///
    /// Any walk, read or hashing failure is fatal, as is a plugin that
    /// violates its capability contract.
    pub fn build(&self, root: &Path, pool: &ThreadPool) -> Result<Inventory, IndexerError> {
        let files = self.collect_files(root)?;
        tracing::info!("Found {} asset(s) under {}", files.len(), root.display());

        let assets = Mutex::new(Vec::with_capacity(files.len()));
        let winner: Mutex<Option<ProbeWinner>> = Mutex::new(None);

        pool.install(|| {
            files
                .par_iter()
                .enumerate()
                .try_for_each(|(rank, file)| self.index_file(rank, file, &assets, &winner))
        })?;

        let mut assets = assets.into_inner().unwrap_or_else(PoisonError::into_inner);
        assets.sort_by(|a, b| a.file_path.cmp(&b.file_path));

        let plugin = winner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .map(|winner| winner.plugin);

        Ok(Inventory { assets, plugin })
    }

    /// Regular files under `root` minus the manifest and old packages, sorted by asset path
    ///
    /// Symbolic links to regular files count as files. Symlinked directories
    /// are not descended into.
    fn collect_files(&self, root: &Path) -> Result<Vec<AssetFile>, IndexerError> {
        let mut files = Vec::new();

        for entry in WalkDir::new(root) {
            let entry = entry.map_err(|e| {
                IndexerError::io(format!("walking {}", root.display()))(e.into())
            })?;
            if !is_regular_file(&entry) {
                continue;
            }

            let Some(asset_path) = relative_asset_path(root, entry.path()) else {
                let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
                return Err(IndexerError::InvalidAssetPath(relative.to_path_buf()));
            };

            let file_name = asset_file_name(&asset_path);
            if self.config.is_manifest(file_name) || self.config.is_package(file_name) {
                tracing::debug!("Excluding {}", asset_path);
                continue;
            }
            let probe = self.config.is_library_candidate(file_name);

            files.push(AssetFile {
                path: entry.into_path(),
                asset_path,
                probe,
            });
        }

        files.sort_by(|a, b| a.asset_path.cmp(&b.asset_path));
        Ok(files)
    }

    fn index_file(
        &self,
        rank: usize,
        file: &AssetFile,
        assets: &Mutex<Vec<AssetRecord>>,
        winner: &Mutex<Option<ProbeWinner>>,
    ) -> Result<(), IndexerError> {
        let (digest, size) = digest_file(&file.path, self.config.hash_chunk_size)
            .map_err(IndexerError::io(format!("hashing {}", file.asset_path)))?;
        tracing::debug!("Hashed {} ({} bytes, {})", file.asset_path, size, digest);

        if file.probe && !outranked(winner, rank) {
            self.probe_file(rank, file, winner)?;
        }

        lock(assets).push(AssetRecord::new(file.asset_path.clone(), size, digest));
        Ok(())
    }

    fn probe_file(
        &self,
        rank: usize,
        file: &AssetFile,
        winner: &Mutex<Option<ProbeWinner>>,
    ) -> Result<(), IndexerError> {
        match self.prober.probe(&file.path, &file.asset_path)? {
            ProbeOutcome::Rejected(rejection) => {
                tracing::debug!("Skipping {}: {}", file.asset_path, rejection);
            }
            ProbeOutcome::Plugin(plugin) => {
                tracing::info!(
                    "Found plugin library {} ({} {})",
                    file.asset_path,
                    plugin.metadata.name,
                    plugin.plugin_version
                );
                match offer(winner, rank, *plugin) {
                    Offer::Taken { replaced: None } => {}
                    Offer::Taken {
                        replaced: Some(previous),
                    } => tracing::warn!(
                        "Multiple plugin libraries found; using {} instead of {}",
                        file.asset_path,
                        previous
                    ),
                    Offer::Discarded { kept } => tracing::warn!(
                        "Multiple plugin libraries found; using {} instead of {}",
                        kept,
                        file.asset_path
                    ),
                }
            }
        }
        Ok(())
    }
}

/// Whether `entry` is a regular file, or a symbolic link resolving to one
fn is_regular_file(entry: &DirEntry) -> bool {
    let file_type = entry.file_type();
    if !file_type.is_symlink() {
        return file_type.is_file();
    }

    match entry.path().metadata() {
        Ok(target) => target.is_file(),
        Err(e) => {
            tracing::warn!("Skipping unresolvable link {}: {}", entry.path().display(), e);
            false
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A poisoned lock means another worker panicked; that panic is surfaced by the pool.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Whether a winner ranked before `rank` already exists
fn outranked(winner: &Mutex<Option<ProbeWinner>>, rank: usize) -> bool {
    matches!(&*lock(winner), Some(current) if current.rank < rank)
}

fn offer(winner: &Mutex<Option<ProbeWinner>>, rank: usize, plugin: ProbedPlugin) -> Offer {
    let mut slot = lock(winner);
    if let Some(current) = slot.as_ref() {
        if current.rank < rank {
            return Offer::Discarded {
                kept: current.plugin.library_name.clone(),
            };
        }
    }

    let replaced = slot
        .replace(ProbeWinner { rank, plugin })
        .map(|previous| previous.plugin.library_name);
    Offer::Taken { replaced }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{AlternativeIcon, LoadError, LoadedModule, PluginMetadata};
    use chrono::DateTime;
    use plugin_abi::{NativeVersion, TryGetApiExportFn};
    use std::fs;

    /// Loader that never finds a plugin
    struct NoPlugins;

    struct NoModule;

    impl CapabilityLoader for NoPlugins {
        type Module = NoModule;

        fn load(&self, path: &Path) -> Result<NoModule, LoadError> {
            Err(LoadError {
                path: path.to_path_buf(),
                reason: "not a module".to_string(),
            })
        }
    }

    impl LoadedModule for NoModule {
        fn api_resolver(&self) -> Option<TryGetApiExportFn> {
            None
        }
    }

    fn pool() -> ThreadPool {
        rayon::ThreadPoolBuilder::new()
            .num_threads(4)
            .build()
            .expect("pool")
    }

    fn plugin(name: &str) -> ProbedPlugin {
        ProbedPlugin {
            library_name: name.to_string(),
            metadata: PluginMetadata {
                name: name.to_string(),
                author: String::new(),
                description: String::new(),
                creation_date: DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
                    .expect("valid"),
                alternative_icon: Some(AlternativeIcon::InlineBase64("AA==".to_string())),
            },
            plugin_version: NativeVersion::new(1, 0, 0),
            standard_version: NativeVersion::new(0, 1, 0),
        }
    }

    #[test]
    fn test_inventory_excludes_manifest_and_packages() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        fs::create_dir_all(root.join("lang").join("deep")).expect("mkdir");
        fs::write(root.join("plugin.dll"), b"not really a dll").expect("write");
        fs::write(root.join("lang").join("en.json"), b"{}").expect("write");
        fs::write(root.join("lang").join("deep").join("MANIFEST.JSON"), b"{}").expect("write");
        fs::write(root.join("manifest.json"), b"{}").expect("write");
        fs::write(root.join("old_1.0.0.ZIP"), b"PK").expect("write");
        fs::write(root.join("empty.bin"), b"").expect("write");

        let config = InventoryConfig::default();
        let inventory = InventoryBuilder::new(&config, NoPlugins)
            .build(root, &pool())
            .expect("builds");

        let paths: Vec<&str> = inventory
            .assets
            .iter()
            .map(|asset| asset.file_path.as_str())
            .collect();
        assert_eq!(paths, vec!["empty.bin", "lang/en.json", "plugin.dll"]);
        assert!(inventory.plugin.is_none());

        let empty = &inventory.assets[0];
        assert_eq!(empty.size, 0);
        assert_eq!(empty.file_hash, Some(Digest::of(b"")));
        assert_eq!(inventory.assets[2].size, 16);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_file_is_an_asset() {
        use std::os::unix::fs::symlink;

        let outside = tempfile::tempdir().expect("tempdir");
        let target = outside.path().join("shared.pak");
        fs::write(&target, b"shared payload").expect("write");

        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        fs::write(root.join("plugin.dll"), b"not really a dll").expect("write");
        symlink(&target, root.join("shared.pak")).expect("symlink");
        symlink(root.join("missing.bin"), root.join("dangling.bin")).expect("symlink");
        symlink(outside.path(), root.join("linked-dir")).expect("symlink");

        let config = InventoryConfig::default();
        let inventory = InventoryBuilder::new(&config, NoPlugins)
            .build(root, &pool())
            .expect("builds");

        let paths: Vec<&str> = inventory
            .assets
            .iter()
            .map(|asset| asset.file_path.as_str())
            .collect();
        assert_eq!(paths, vec!["plugin.dll", "shared.pak"]);

        let shared = &inventory.assets[1];
        assert_eq!(shared.size, 14);
        assert_eq!(shared.file_hash, Some(Digest::of(b"shared payload")));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_file_name_is_fatal() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        fs::write(root.join("plugin.dll"), b"not really a dll").expect("write");
        for name in [&b"data\xff.bin"[..], &b"data\xfe.bin"[..]] {
            // Some file systems refuse non-UTF-8 names outright.
            if fs::write(root.join(OsStr::from_bytes(name)), b"x").is_err() {
                return;
            }
        }

        let config = InventoryConfig::default();
        let error = InventoryBuilder::new(&config, NoPlugins)
            .build(root, &pool())
            .expect_err("non-UTF-8 names must not be indexed");
        assert!(matches!(error, IndexerError::InvalidAssetPath(_)));
    }

    #[test]
    fn test_empty_tree() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = InventoryConfig::default();
        let inventory = InventoryBuilder::new(&config, NoPlugins)
            .build(dir.path(), &pool())
            .expect("builds");
        assert!(inventory.assets.is_empty());
        assert!(inventory.plugin.is_none());
    }

    #[test]
    fn test_lowest_rank_wins_regardless_of_order() {
        let winner = Mutex::new(None);
        assert!(matches!(
            offer(&winner, 5, plugin("z/late.dll")),
            Offer::Taken { replaced: None }
        ));
        assert!(matches!(
            offer(&winner, 2, plugin("a/early.dll")),
            Offer::Taken { replaced: Some(ref previous) } if previous == "z/late.dll"
        ));
        assert!(matches!(
            offer(&winner, 3, plugin("b/middle.dll")),
            Offer::Discarded { ref kept } if kept == "a/early.dll"
        ));

        assert!(outranked(&winner, 3));
        assert!(!outranked(&winner, 1));

        let kept = winner.into_inner().expect("not poisoned").expect("winner");
        assert_eq!(kept.plugin.library_name, "a/early.dll");
    }
}
