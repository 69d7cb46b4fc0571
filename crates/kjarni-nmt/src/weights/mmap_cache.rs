//! Process-wide cache of memory-mapped parameter files.
//!
//! Loading the same model onto several devices maps the file once; every
//! device thread then copies its own parameters out of the shared mapping.
//! The lock is held only for lookup and insertion. A loader evicts what it
//! mapped once the copies are made, so a later load of the same path maps
//! the file as it is on disk then.

use anyhow::{anyhow, Context, Result};
use memmap2::Mmap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

static MMAP_CACHE: OnceLock<Mutex<HashMap<PathBuf, Arc<Mmap>>>> = OnceLock::new();

fn lock_cache() -> Result<MutexGuard<'static, HashMap<PathBuf, Arc<Mmap>>>> {
    MMAP_CACHE
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .map_err(|_| anyhow!("mmap cache lock poisoned"))
}

/// Get or create a memory-mapped file.
///
/// Paths are canonicalized first, so symlinks and relative paths to the same
/// file share one mapping.
pub fn get_or_create_mmap(path: &Path) -> Result<Arc<Mmap>> {
    let canonical = path
        .canonicalize()
        .with_context(|| format!("Failed to canonicalize path: {:?}", path))?;

    let mut guard = lock_cache()?;

    if let Some(mmap) = guard.get(&canonical) {
        log::debug!(
            "Mmap cache hit for {:?}",
            canonical.file_name().unwrap_or_default()
        );
        return Ok(Arc::clone(mmap));
    }

    log::debug!(
        "Mmap cache miss, creating new mapping for {:?}",
        canonical.file_name().unwrap_or_default()
    );

    let file = std::fs::File::open(&canonical)
        .with_context(|| format!("Failed to open file for mmap: {:?}", canonical))?;

    // SAFETY: the file is opened read-only and the Arc keeps the mapping
    // alive for every reader.
    let mmap = Arc::new(unsafe { Mmap::map(&file)? });

    guard.insert(canonical, Arc::clone(&mmap));

    Ok(mmap)
}

/// Clear the global mmap cache.
///
/// Existing `Arc<Mmap>` references held by loaders stay valid until dropped.
pub fn clear_mmap_cache() {
    if let Ok(mut guard) = lock_cache() {
        let count = guard.len();
        guard.clear();
        log::info!("Cleared {} entries from mmap cache", count);
    }
}

/// Drop every cached mapping for `path`, or for files under it when `path`
/// is a directory. Returns how many entries were removed.
///
/// Outstanding `Arc<Mmap>` references stay valid until dropped.
pub fn evict_mmap(path: &Path) -> usize {
    let root = match path.canonicalize() {
        Ok(p) => p,
        Err(_) => path.to_path_buf(),
    };
    let Ok(mut guard) = lock_cache() else {
        return 0;
    };
    let before = guard.len();
    guard.retain(|cached, _| !cached.starts_with(&root));
    let evicted = before - guard.len();
    if evicted > 0 {
        log::debug!("Evicted {} mapping(s) under {:?}", evicted, root);
    }
    evicted
}

/// Returns `(file_count, total_bytes)` for the cached mappings.
pub fn mmap_cache_stats() -> (usize, usize) {
    match lock_cache() {
        Ok(guard) => (guard.len(), guard.values().map(|m| m.len()).sum()),
        Err(_) => (0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_same_file_shares_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(&[1, 2, 3, 4]).unwrap();
        drop(f);

        let a = get_or_create_mmap(&path).unwrap();
        let b = get_or_create_mmap(&dir.path().join(".").join("blob.bin")).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(&a[..], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_evicted_path_is_mapped_again() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("swap.bin");
        std::fs::write(&path, [1u8, 1, 1]).unwrap();
        let old = get_or_create_mmap(&path).unwrap();

        let staged = dir.path().join("swap.tmp");
        std::fs::write(&staged, [2u8, 2, 2, 2]).unwrap();
        std::fs::rename(&staged, &path).unwrap();

        assert_eq!(evict_mmap(dir.path()), 1);
        let new = get_or_create_mmap(&path).unwrap();
        assert!(!Arc::ptr_eq(&old, &new));
        assert_eq!(&new[..], &[2, 2, 2, 2]);
        assert_eq!(&old[..], &[1, 1, 1]);
        assert_eq!(evict_mmap(&path), 1);
        assert_eq!(evict_mmap(&path), 0);
    }

    #[test]
    fn test_missing_file_errors() {
        let err = get_or_create_mmap(Path::new("/definitely/not/here.safetensors")).unwrap_err();
        assert!(err.to_string().contains("canonicalize"));
    }
}
