//! Bounded in-memory cache of compiled commands.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;
use shellspark_tools::Fingerprint;
use tracing::trace;

/// Default number of compiled commands retained.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Key of a cached compilation: the plan's structural hash plus the tool
/// fingerprint it was compiled against. A tool-set change therefore misses
/// naturally instead of serving a stale command.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Structural hash of the plan.
    pub plan_hash: u64,
    /// Fingerprint of the resolved tool set.
    pub fingerprint: Fingerprint,
}

/// LRU cache from [`CacheKey`] to compiled command strings.
///
/// Only successful compilations are inserted; errors and partial plans are
/// never cached.
#[derive(Debug)]
pub struct CompileCache {
    inner: Mutex<LruCache<CacheKey, String>>,
}

impl Default for CompileCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl CompileCache {
    /// Create a cache bounded to `capacity` entries (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity is at least 1");
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Look up a compiled command.
    pub fn get(&self, key: &CacheKey) -> Option<String> {
        let hit = self.inner.lock().get(key).cloned();
        trace!(plan_hash = key.plan_hash, hit = hit.is_some(), "cache lookup");
        hit
    }

    /// Store a compiled command.
    pub fn insert(&self, key: CacheKey, command: String) {
        self.inner.lock().put(key, command);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
