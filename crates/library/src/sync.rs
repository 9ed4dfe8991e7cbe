use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

use common::FileInfo;
use metadata::TagProvider;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::LibraryError;
use crate::store::TagStore;
use crate::walker::AudioFileWalker;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub failed: usize,
}

/// Brings `store` in line with the files reported by `walker`.
///
/// Stored paths that vanished are removed. New paths are extracted and stored.
/// Known paths are re-extracted only when the filesystem mtime is strictly newer
/// than the stored one, so a pass over an unchanged tree extracts and writes
/// nothing. A failed extraction is logged and leaves that path's record as it
/// was; store and walker errors abort the pass.
pub fn sync_files<S, P, W>(store: &S, provider: &P, walker: &W) -> Result<SyncStats, LibraryError>
where
    S: TagStore + ?Sized,
    P: TagProvider + ?Sized,
    W: AudioFileWalker + ?Sized,
{
    let started = Instant::now();
    let stored = by_path(store.get_files()?);
    let current = by_path(walker.get_files()?);
    debug!(
        "Synchronizing {} stored against {} found files",
        stored.len(),
        current.len()
    );

    let mut stats = SyncStats::default();

    for path in sorted_paths(&stored, |path| !current.contains_key(path)) {
        info!("Removing vanished file {}", path.display());
        store.remove(&path)?;
        stats.removed += 1;
    }

    for path in sorted_paths(&current, |path| !stored.contains_key(path)) {
        info!("Scanning new file {}", path.display());
        if scan_file(store, provider, &current[&path])? {
            stats.added += 1;
        } else {
            stats.failed += 1;
        }
    }

    for path in sorted_paths(&current, |path| stored.contains_key(path)) {
        let found = &current[&path];
        if found.mtime > stored[&path].mtime {
            info!("Scanning modified file {}", path.display());
            if scan_file(store, provider, found)? {
                stats.updated += 1;
            } else {
                stats.failed += 1;
            }
        } else {
            stats.unchanged += 1;
        }
    }

    info!(
        "Synchronized in {:?}: {} added, {} updated, {} removed, {} unchanged, {} failed",
        started.elapsed(),
        stats.added,
        stats.updated,
        stats.removed,
        stats.unchanged,
        stats.failed
    );
    Ok(stats)
}

fn scan_file<S, P>(store: &S, provider: &P, file: &FileInfo) -> Result<bool, LibraryError>
where
    S: TagStore + ?Sized,
    P: TagProvider + ?Sized,
{
    match provider.get_tags(&file.path) {
        Ok(tags) => {
            store.upsert(file, &tags)?;
            Ok(true)
        }
        Err(err) => {
            warn!("Failed to read tags for {:?}: {}", file.path, err);
            Ok(false)
        }
    }
}

fn by_path(files: Vec<FileInfo>) -> HashMap<PathBuf, FileInfo> {
    files
        .into_iter()
        .map(|file| (file.path.clone(), file))
        .collect()
}

fn sorted_paths(
    files: &HashMap<PathBuf, FileInfo>,
    keep: impl Fn(&PathBuf) -> bool,
) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = files.keys().filter(|path| keep(path)).cloned().collect();
    paths.sort();
    paths
}
