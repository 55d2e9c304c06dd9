//! Content-Addressed Layout Cache
//!
//! Maps a [`ContentHash`] to the tree built from those bytes, in two tiers:
//! - Hot: bounded `LruCache`, evicts least recently used
//! - Permanent: unbounded [`PermanentTier`], kept until `clear()`
//!
//! A permanent hit is promoted back into the hot tier. `get_or_compute` runs
//! the build closure at most once per hash across all concurrent callers;
//! the others block and share its outcome.

pub mod tier;

pub use tier::{DirectoryTier, MemoryTier, PermanentTier};

use crate::cancel::CancellationToken;
use crate::core::hash::ContentHash;
use crate::error::{CacheError, ParseError};
use crate::tree::Node;
use lru::LruCache;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub use crate::config::DEFAULT_HOT_CAPACITY;

/// How often a cancellable waiter re-checks its token
const CANCEL_POLL: Duration = Duration::from_millis(10);

/// Outcome shared by every caller of one computation
type Shared = Result<Arc<Node>, ParseError>;

/// Both tiers live under one lock so `clear` is atomic for readers
struct Tiers {
    hot: LruCache<ContentHash, Arc<Node>>,
    permanent: Box<dyn PermanentTier>,
}

/// A computation in progress for one hash
struct InFlight {
    result: Mutex<Option<Shared>>,
    ready: Condvar,
}

impl InFlight {
    fn new() -> Self {
        InFlight {
            result: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    fn complete(&self, result: Shared) {
        *self.result.lock() = Some(result);
        self.ready.notify_all();
    }

    /// Block until the leader completes, or until `cancel` fires
    fn wait(&self, cancel: Option<&CancellationToken>) -> Shared {
        let mut slot = self.result.lock();
        loop {
            if let Some(result) = slot.as_ref() {
                return result.clone();
            }
            match cancel {
                Some(token) if token.is_cancelled() => return Err(ParseError::Cancelled),
                Some(_) => {
                    self.ready.wait_for(&mut slot, CANCEL_POLL);
                }
                None => self.ready.wait(&mut slot),
            }
        }
    }
}

/// Releases waiters and the in-flight slot even if the computation panics
struct Leader<'a> {
    cache: &'a LayoutCache,
    hash: ContentHash,
    flight: Arc<InFlight>,
    done: bool,
}

impl Leader<'_> {
    fn finish(mut self, result: Shared) {
        self.flight.complete(result);
        self.cache.in_flight.lock().remove(&self.hash);
        self.done = true;
    }
}

impl Drop for Leader<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.flight
                .complete(Err(ParseError::ComputationAbandoned(self.hash)));
            self.cache.in_flight.lock().remove(&self.hash);
        }
    }
}

/// Counters for cache effectiveness
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    promotions: AtomicU64,
}

/// Point-in-time copy of [`CacheStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    /// Lookups answered from either tier
    pub hits: u64,
    /// Computations started
    pub misses: u64,
    /// Permanent hits copied back into the hot tier
    pub promotions: u64,
}

impl CacheStats {
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            promotions: self.promotions.load(Ordering::Relaxed),
        }
    }
}

/// Two-tier content-addressed cache of parsed trees
pub struct LayoutCache {
    tiers: Mutex<Tiers>,
    in_flight: Mutex<HashMap<ContentHash, Arc<InFlight>>>,
    capacity: NonZeroUsize,
    stats: CacheStats,
}

impl LayoutCache {
    /// In-memory cache with the given hot capacity (0 is treated as 1)
    pub fn new(hot_capacity: usize) -> Self {
        Self::with_permanent(hot_capacity, Box::new(MemoryTier::new()))
    }

    /// Cache over a caller-supplied permanent tier
    pub fn with_permanent(hot_capacity: usize, permanent: Box<dyn PermanentTier>) -> Self {
        let capacity = NonZeroUsize::new(hot_capacity).unwrap_or(NonZeroUsize::MIN);
        LayoutCache {
            tiers: Mutex::new(Tiers {
                hot: LruCache::new(capacity),
                permanent,
            }),
            in_flight: Mutex::new(HashMap::new()),
            capacity,
            stats: CacheStats::default(),
        }
    }

    /// Look a hash up, hot tier first. A permanent hit is promoted.
    pub fn get(&self, hash: &ContentHash) -> Result<Option<Arc<Node>>, CacheError> {
        let mut tiers = self.tiers.lock();
        if let Some(node) = tiers.hot.get(hash) {
            return Ok(Some(Arc::clone(node)));
        }

        let found = tiers.permanent.get(hash)?;
        if let Some(node) = &found {
            tiers.hot.put(*hash, Arc::clone(node));
            self.stats.promotions.fetch_add(1, Ordering::Relaxed);
        }
        Ok(found)
    }

    /// Store a tree in both tiers
    pub fn put(&self, hash: ContentHash, node: Arc<Node>) -> Result<(), CacheError> {
        let mut tiers = self.tiers.lock();
        tiers.permanent.put(hash, Arc::clone(&node))?;
        tiers.hot.put(hash, node);
        Ok(())
    }

    /// True if either tier holds the hash. Does not touch LRU order.
    pub fn contains(&self, hash: &ContentHash) -> bool {
        let tiers = self.tiers.lock();
        tiers.hot.contains(hash) || tiers.permanent.contains(hash)
    }

    /// Return the cached tree for `hash`, or run `compute` to build it.
    ///
    /// `compute` runs at most once per hash however many callers race here.
    /// Callers that arrive while it runs block and receive the same
    /// `Arc<Node>`, or a clone of the same error. A failed computation caches
    /// nothing, so a later call retries.
    pub fn get_or_compute<F>(&self, hash: ContentHash, compute: F) -> Result<Arc<Node>, ParseError>
    where
        F: FnOnce() -> Result<Node, ParseError>,
    {
        self.get_or_compute_with(hash, None, compute)
    }

    /// [`get_or_compute`](Self::get_or_compute) for a caller that may be
    /// cancelled. A cancelled waiter returns `Cancelled`; the computation it
    /// was waiting on carries on for everyone else. A waiter whose leader
    /// ended in `Cancelled` without its own token firing starts over.
    pub fn get_or_compute_with<F>(
        &self,
        hash: ContentHash,
        cancel: Option<&CancellationToken>,
        compute: F,
    ) -> Result<Arc<Node>, ParseError>
    where
        F: FnOnce() -> Result<Node, ParseError>,
    {
        loop {
            if let Some(node) = self.get(&hash)? {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(node);
            }

            let flight = {
                let mut in_flight = self.in_flight.lock();
                match in_flight.get(&hash) {
                    Some(flight) => Err(Arc::clone(flight)),
                    None => {
                        // A leader may have stored the tree since our miss
                        if let Some(node) = self.get(&hash)? {
                            self.stats.hits.fetch_add(1, Ordering::Relaxed);
                            return Ok(node);
                        }
                        let flight = Arc::new(InFlight::new());
                        in_flight.insert(hash, Arc::clone(&flight));
                        Ok(flight)
                    }
                }
            };

            let flight = match flight {
                Ok(flight) => flight,
                Err(running) => match running.wait(cancel) {
                    // The leader was cancelled, not us: try again
                    Err(ParseError::Cancelled) if !cancel.is_some_and(|t| t.is_cancelled()) => continue,
                    result => {
                        if result.is_ok() {
                            self.stats.hits.fetch_add(1, Ordering::Relaxed);
                        }
                        return result;
                    }
                },
            };

            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            let leader = Leader {
                cache: self,
                hash,
                flight,
                done: false,
            };

            let result = compute().map(Arc::new).and_then(|node| {
                self.put(hash, Arc::clone(&node))?;
                Ok(node)
            });
            leader.finish(result.clone());
            return result;
        }
    }

    /// Empty both tiers. Concurrent readers see the cache entirely before or
    /// entirely after. If the permanent tier fails to clear, the hot tier is
    /// left untouched.
    pub fn clear(&self) -> Result<(), CacheError> {
        let mut tiers = self.tiers.lock();
        tiers.permanent.clear()?;
        tiers.hot.clear();
        Ok(())
    }

    /// Entries in the hot tier
    pub fn size(&self) -> usize {
        self.tiers.lock().hot.len()
    }

    /// Hot tier capacity
    pub fn max_size(&self) -> usize {
        self.capacity.get()
    }

    /// Entries in the permanent tier
    pub fn permanent_size(&self) -> usize {
        self.tiers.lock().permanent.len()
    }

    /// Every tree in the permanent tier
    pub fn get_all(&self) -> Result<Vec<Arc<Node>>, CacheError> {
        self.tiers.lock().permanent.values()
    }

    /// Hashes with a computation currently running
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }
}

impl Default for LayoutCache {
    fn default() -> Self {
        Self::new(DEFAULT_HOT_CAPACITY)
    }
}

impl fmt::Debug for LayoutCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutCache")
            .field("size", &self.size())
            .field("max_size", &self.max_size())
            .field("permanent_size", &self.permanent_size())
            .field("stats", &self.stats())
            .finish()
    }
}
