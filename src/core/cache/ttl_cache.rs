use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::Instant;

struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant, ttl: Duration) -> bool {
        now.duration_since(self.stored_at) < ttl
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub ttl_secs: u64,
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// String-keyed memoization store whose entries expire `ttl` after insertion.
///
/// Lookups never return an expired value. Expired entries are dropped lazily
/// whenever something is inserted.
pub struct TtlCache<V> {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let guard = self.entries.read().await;
        match guard.get(key) {
            Some(entry) if entry.is_live(now, self.ttl) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub async fn insert(&self, key: String, value: V) {
        let now = Instant::now();
        let ttl = self.ttl;
        let mut guard = self.entries.write().await;
        guard.retain(|_, e| e.is_live(now, ttl));
        guard.insert(
            key,
            CacheEntry {
                value,
                stored_at: now,
            },
        );
    }

    /// Return the live value for `key`, or compute, store and return it.
    ///
    /// Errors from `f` are passed through and nothing is stored. Two callers
    /// missing on the same key at once will both run `f`; the later insert wins.
    pub async fn get_or_try_insert_with<F, Fut>(&self, key: &str, f: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(v) = self.get(key).await {
            return Ok(v);
        }

        let value = f().await?;
        self.insert(key.to_string(), value.clone()).await;
        Ok(value)
    }

    pub async fn invalidate_all(&self) -> usize {
        let mut guard = self.entries.write().await;
        let n = guard.len();
        guard.clear();
        n
    }

    /// Drop expired entries and return how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let ttl = self.ttl;
        let mut guard = self.entries.write().await;
        let before = guard.len();
        guard.retain(|_, e| e.is_live(now, ttl));
        before - guard.len()
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.is_live(now, self.ttl))
            .count()
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            ttl_secs: self.ttl.as_secs(),
            entries: self.len().await,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
