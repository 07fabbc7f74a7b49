//! File history cache.
//!
//! Holds parsed `git log --follow` output per (repository, path) so that the
//! change statistics of a file are computed once per batch, not once per
//! commit touching it. The cache is constructed explicitly and shared between
//! workers as `Arc<dyn HistoryCache>`:
//! - `LruHistoryCache`: bounded LRU behind a mutex
//! - `NoopHistoryCache`: never stores anything (tests, one-shot runs)
//!
//! Concurrent misses on the same key may both compute; the last insert wins.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

/// Default number of cached files.
pub const DEFAULT_CAPACITY: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub repository: String,
    pub path: String,
}

impl CacheKey {
    pub fn new(repository: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            path: path.into(),
        }
    }
}

/// One commit touching a file, newest first in a history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub commit_id: String,
    pub author_name: String,
    pub author_email: String,
    pub committer_name: String,
    pub committer_email: String,
}

pub type FileHistory = Arc<Vec<LogEntry>>;

pub trait HistoryCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<FileHistory>;
    fn put(&self, key: CacheKey, value: FileHistory);
    /// Number of cached histories.
    fn len(&self) -> usize;
}

pub struct LruHistoryCache {
    inner: Mutex<LruCache<CacheKey, FileHistory>>,
}

impl LruHistoryCache {
    pub fn new(capacity: usize) -> Self {
        // Avoid zero capacity panics
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(cap)),
        }
    }
}

impl Default for LruHistoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl HistoryCache for LruHistoryCache {
    fn get(&self, key: &CacheKey) -> Option<FileHistory> {
        // a poisoned lock only means another worker panicked mid-update
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.get(key).cloned()
    }

    fn put(&self, key: CacheKey, value: FileHistory) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.put(key, value);
    }

    fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

pub struct NoopHistoryCache;

impl HistoryCache for NoopHistoryCache {
    fn get(&self, _key: &CacheKey) -> Option<FileHistory> {
        None
    }

    fn put(&self, _key: CacheKey, _value: FileHistory) {}

    fn len(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(id: &str) -> FileHistory {
        Arc::new(vec![LogEntry {
            commit_id: id.to_string(),
            author_name: "a".to_string(),
            author_email: "a@x".to_string(),
            committer_name: "a".to_string(),
            committer_email: "a@x".to_string(),
        }])
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = LruHistoryCache::new(2);
        cache.put(CacheKey::new("r", "a.c"), history("1"));
        cache.put(CacheKey::new("r", "b.c"), history("2"));
        assert!(cache.get(&CacheKey::new("r", "a.c")).is_some());
        cache.put(CacheKey::new("r", "c.c"), history("3"));

        assert!(cache.get(&CacheKey::new("r", "b.c")).is_none());
        assert!(cache.get(&CacheKey::new("r", "a.c")).is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn keys_are_scoped_by_repository() {
        let cache = LruHistoryCache::default();
        cache.put(CacheKey::new("one", "a.c"), history("1"));
        assert!(cache.get(&CacheKey::new("two", "a.c")).is_none());
    }

    #[test]
    fn zero_capacity_still_holds_one_entry() {
        let cache = LruHistoryCache::new(0);
        cache.put(CacheKey::new("r", "a.c"), history("1"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn noop_cache_stores_nothing() {
        let cache = NoopHistoryCache;
        cache.put(CacheKey::new("r", "a.c"), history("1"));
        assert!(cache.get(&CacheKey::new("r", "a.c")).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn shared_between_threads() {
        let cache: Arc<dyn HistoryCache> = Arc::new(LruHistoryCache::new(16));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    let key = CacheKey::new("r", format!("{}.c", i));
                    cache.put(key.clone(), history(&i.to_string()));
                    cache.get(&key).is_some()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
