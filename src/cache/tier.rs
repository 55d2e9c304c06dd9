//! Permanent Cache Tier
//!
//! The unbounded backing store behind the hot LRU tier. Entries stay until
//! the cache is cleared. [`MemoryTier`] keeps them in a map;
//! [`DirectoryTier`] writes one JSON file per content hash so a layout
//! survives a process restart.

use crate::core::hash::ContentHash;
use crate::error::CacheError;
use crate::tree::Node;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Storage behind the hot tier. Always accessed under the cache lock.
pub trait PermanentTier: Send {
    fn get(&mut self, hash: &ContentHash) -> Result<Option<Arc<Node>>, CacheError>;

    fn put(&mut self, hash: ContentHash, node: Arc<Node>) -> Result<(), CacheError>;

    fn contains(&self, hash: &ContentHash) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every stored tree, in no particular order
    fn values(&mut self) -> Result<Vec<Arc<Node>>, CacheError>;

    fn clear(&mut self) -> Result<(), CacheError>;
}

/// In-process permanent tier
#[derive(Debug, Default)]
pub struct MemoryTier {
    entries: HashMap<ContentHash, Arc<Node>>,
}

impl MemoryTier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PermanentTier for MemoryTier {
    fn get(&mut self, hash: &ContentHash) -> Result<Option<Arc<Node>>, CacheError> {
        Ok(self.entries.get(hash).cloned())
    }

    fn put(&mut self, hash: ContentHash, node: Arc<Node>) -> Result<(), CacheError> {
        self.entries.insert(hash, node);
        Ok(())
    }

    fn contains(&self, hash: &ContentHash) -> bool {
        self.entries.contains_key(hash)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn values(&mut self) -> Result<Vec<Arc<Node>>, CacheError> {
        Ok(self.entries.values().cloned().collect())
    }

    fn clear(&mut self) -> Result<(), CacheError> {
        self.entries.clear();
        Ok(())
    }
}

const ENTRY_EXTENSION: &str = "json";

/// Directory-backed permanent tier: `<dir>/<hex hash>.json`
///
/// Files are written to a temporary name and renamed into place, so a
/// reader never sees a half-written entry. Loaded trees are not kept in
/// memory; the hot tier does that.
#[derive(Debug)]
pub struct DirectoryTier {
    dir: PathBuf,
    index: HashSet<ContentHash>,
}

impl DirectoryTier {
    /// Open (creating if needed) a cache directory and index its entries.
    /// Files whose name is not a hash are ignored.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, CacheError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| unavailable(&dir, e))?;

        let mut index = HashSet::new();
        for entry in fs::read_dir(&dir).map_err(|e| unavailable(&dir, e))? {
            let path = entry.map_err(|e| unavailable(&dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            if let Some(hash) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(ContentHash::from_hex)
            {
                index.insert(hash);
            }
        }

        Ok(DirectoryTier { dir, index })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, hash: &ContentHash) -> PathBuf {
        self.dir.join(format!("{}.{}", hash.to_hex(), ENTRY_EXTENSION))
    }

    fn load(&self, path: &Path) -> Result<Node, CacheError> {
        let bytes = fs::read(path).map_err(|e| unavailable(path, e))?;
        serde_json::from_slice(&bytes).map_err(|e| unavailable(path, e))
    }
}

impl PermanentTier for DirectoryTier {
    fn get(&mut self, hash: &ContentHash) -> Result<Option<Arc<Node>>, CacheError> {
        if !self.index.contains(hash) {
            return Ok(None);
        }
        let path = self.entry_path(hash);
        match self.load(&path) {
            Ok(node) => Ok(Some(Arc::new(node))),
            Err(_) if !path.exists() => {
                // removed behind our back
                self.index.remove(hash);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn put(&mut self, hash: ContentHash, node: Arc<Node>) -> Result<(), CacheError> {
        let path = self.entry_path(&hash);
        let tmp = path.with_extension("tmp");
        let bytes = serde_json::to_vec(node.as_ref()).map_err(|e| unavailable(&path, e))?;

        let write = || -> io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
            fs::rename(&tmp, &path)
        };
        if let Err(e) = write() {
            let _ = fs::remove_file(&tmp);
            return Err(unavailable(&path, e));
        }

        self.index.insert(hash);
        Ok(())
    }

    fn contains(&self, hash: &ContentHash) -> bool {
        self.index.contains(hash)
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn values(&mut self) -> Result<Vec<Arc<Node>>, CacheError> {
        self.index
            .iter()
            .map(|hash| self.load(&self.entry_path(hash)).map(Arc::new))
            .collect()
    }

    fn clear(&mut self) -> Result<(), CacheError> {
        let hashes: Vec<ContentHash> = self.index.iter().copied().collect();
        for hash in hashes {
            let path = self.entry_path(&hash);
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(unavailable(&path, e)),
            }
            // only forget entries that are gone from disk
            self.index.remove(&hash);
        }
        Ok(())
    }
}

fn unavailable(path: &Path, cause: impl std::fmt::Display) -> CacheError {
    CacheError::unavailable(format!("{}: {}", path.display(), cause))
}

#[cfg(test)]
pub(crate) fn temp_cache_dir(label: &str) -> PathBuf {
    use std::sync::atomic::{AtomicUsize, Ordering};
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let id = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("rustylayout_{}_{}_{}", label, std::process::id(), id))
}
