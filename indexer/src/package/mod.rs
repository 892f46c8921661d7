//! Package builder
//!
//! Every asset is Brotli-compressed into its own buffer and stored in the
//! ZIP container as `<asset path>.br` without further compression. Plugin
//! hosts decompress entries one by one, so the container itself only needs
//! to be an index.
//!
//! Compression runs on the worker pool, one task per asset. The container
//! writer is not thread-safe: only the copy of a finished buffer into it is
//! serialized, behind a `Mutex`.

use crate::config::PackageConfig;
use crate::error::IndexerError;
use crate::manifest::AssetRecord;
use chrono::{DateTime, Datelike, Timelike, Utc};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Suffix appended to every entry name
pub const COMPRESSED_SUFFIX: &str = ".br";

/// Years a ZIP (DOS) timestamp can represent
const ARCHIVE_YEARS: std::ops::RangeInclusive<i32> = 1980..=2107;

const BROTLI_BUFFER_SIZE: usize = 4096;

/// Convert a modification time to a ZIP timestamp
///
/// Times outside the DOS range become 1980-01-01 00:00:00.
pub fn to_archive_timestamp(modified: DateTime<Utc>) -> zip::DateTime {
    if !ARCHIVE_YEARS.contains(&modified.year()) {
        return zip::DateTime::default();
    }

    zip::DateTime::from_date_and_time(
        modified.year() as u16,
        modified.month() as u8,
        modified.day() as u8,
        modified.hour() as u8,
        modified.minute() as u8,
        modified.second() as u8,
    )
    .unwrap_or_default()
}

/// Convert a file system modification time to a ZIP timestamp
///
/// File systems store times chrono cannot represent; those, and every time
/// before the epoch, become 1980-01-01 00:00:00 as well.
pub fn file_time_to_archive_timestamp(modified: SystemTime) -> zip::DateTime {
    modified
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|since| {
            let secs = i64::try_from(since.as_secs()).ok()?;
            DateTime::<Utc>::from_timestamp(secs, since.subsec_nanos())
        })
        .map(to_archive_timestamp)
        .unwrap_or_default()
}

/// Brotli-compress everything `reader` yields
pub fn compress(
    reader: &mut impl io::Read,
    quality: u32,
    window: u32,
) -> io::Result<Vec<u8>> {
    let mut compressor =
        brotli::CompressorWriter::new(Vec::new(), BROTLI_BUFFER_SIZE, quality, window);
    io::copy(reader, &mut compressor)?;
    // Finishes the stream.
    Ok(compressor.into_inner())
}

/// Entry name of an asset inside the container
pub fn entry_name(asset_path: &str) -> String {
    format!("{}{}", asset_path, COMPRESSED_SUFFIX)
}

/// What was written
#[derive(Debug, Clone)]
pub struct PackageSummary {
    pub path: PathBuf,
    pub entries: usize,
    pub compressed_bytes: u64,
}

/// Writes the package archive
pub struct PackageBuilder<'c> {
    config: &'c PackageConfig,
}

impl<'c> PackageBuilder<'c> {
    pub fn new(config: &'c PackageConfig) -> Self {
        Self { config }
    }

    /// Compress `assets` (read from under `root`) into a new archive at `archive_path`
    ///
    /// An existing archive at that path is replaced.
    ///
    /// # Errors
    ///
    /// Any read, compression or container failure aborts the build. The
    /// partially written archive is left on disk.
    pub fn build(
        &self,
        root: &Path,
        archive_path: &Path,
        assets: &[AssetRecord],
        pool: &ThreadPool,
    ) -> Result<PackageSummary, IndexerError> {
        let file = File::create(archive_path)
            .map_err(IndexerError::io(format!("creating {}", archive_path.display())))?;
        let archive = Mutex::new(ZipWriter::new(file));

        let total = assets.len();
        let started = AtomicUsize::new(0);
        let compressed_bytes = AtomicUsize::new(0);

        pool.install(|| {
            assets.par_iter().try_for_each(|asset| {
                let index = started.fetch_add(1, Ordering::Relaxed) + 1;
                let written = self.add_asset(root, asset, &archive, index, total)?;
                compressed_bytes.fetch_add(written, Ordering::Relaxed);
                Ok::<_, IndexerError>(())
            })
        })?;

        let writer = archive.into_inner().unwrap_or_else(PoisonError::into_inner);
        writer.finish()?;

        Ok(PackageSummary {
            path: archive_path.to_path_buf(),
            entries: total,
            compressed_bytes: compressed_bytes.into_inner() as u64,
        })
    }

    fn add_asset(
        &self,
        root: &Path,
        asset: &AssetRecord,
        archive: &Mutex<ZipWriter<File>>,
        index: usize,
        total: usize,
    ) -> Result<usize, IndexerError> {
        let source = root.join(&asset.file_path);

        println!(
            "  [{}/{}] Compressing asset to buffer: {}",
            index, total, asset.file_path
        );

        let modified = fs::metadata(&source)
            .and_then(|metadata| metadata.modified())
            .map_err(IndexerError::io(format!("reading timestamp of {}", asset.file_path)))?;
        let timestamp = file_time_to_archive_timestamp(modified);

        let buffer = File::open(&source)
            .and_then(|mut file| {
                compress(
                    &mut file,
                    self.config.brotli_quality,
                    self.config.brotli_window,
                )
            })
            .map_err(IndexerError::io(format!("compressing {}", asset.file_path)))?;

        println!(
            "  [{}/{}] Compress done. Now locking and writing buffer to package for: {}",
            index, total, asset.file_path
        );

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .last_modified_time(timestamp)
            .large_file(buffer.len() as u64 >= u64::from(u32::MAX));

        let mut writer = archive.lock().unwrap_or_else(PoisonError::into_inner);
        writer.start_file(entry_name(&asset.file_path), options)?;
        writer
            .write_all(&buffer)
            .map_err(IndexerError::io(format!("writing {} to package", asset.file_path)))?;
        drop(writer);

        tracing::debug!(
            "Packed {} ({} -> {} bytes)",
            asset.file_path,
            asset.size,
            buffer.len()
        );
        Ok(buffer.len())
    }
}
