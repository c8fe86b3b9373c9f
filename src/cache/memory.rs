//! In-process cache with per-key expiry.
//!
//! Entries live in a DashMap; expiry is checked lazily on access against
//! `tokio::time::Instant`, so tests can drive TTLs with `tokio::time::advance`.
//! Writes also sweep out every expired entry at most once per
//! [`SWEEP_INTERVAL`], so keys that are never read again do not pile up.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Minimum time between two full sweeps of expired entries
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

use super::{Cache, CacheError};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: impl Into<String>, expires_at: Option<Instant>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// Thread-safe in-memory cache.
pub struct MemoryCache {
    entries: DashMap<String, Entry>,
    started: Instant,
    /// Milliseconds since `started` at the last sweep
    last_sweep_ms: AtomicU64,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            started: Instant::now(),
            last_sweep_ms: AtomicU64::new(0),
        }
    }

    /// Drop expired entries if the last sweep is older than [`SWEEP_INTERVAL`].
    /// Must not be called while holding a guard into `entries`.
    fn maybe_sweep(&self, now: Instant) {
        let now_ms = now.duration_since(self.started).as_millis() as u64;
        let last = self.last_sweep_ms.load(Ordering::Relaxed);
        if now_ms.saturating_sub(last) < SWEEP_INTERVAL.as_millis() as u64 {
            return;
        }
        // One writer wins the sweep; the others carry on.
        if self
            .last_sweep_ms
            .compare_exchange(last, now_ms, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
        {
            let before = self.entries.len();
            self.entries.retain(|_, e| e.is_live(now));
            let evicted = before.saturating_sub(self.entries.len());
            if evicted > 0 {
                tracing::debug!(evicted, "Swept expired cache entries");
            }
        }
    }

    /// Remaining lifetime of `key`, `None` if absent, expired or persistent.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|e| e.is_live(now))
            .and_then(|e| e.expires_at)
            .map(|at| at - now)
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        {
            match self.entries.get(key) {
                Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        // Read guard is released above; evicting under it would deadlock the shard.
        self.entries.remove_if(key, |_, e| !e.is_live(now));
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        self.maybe_sweep(now);
        self.entries
            .insert(key.to_string(), Entry::new(value, Some(now + ttl)));
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, CacheError> {
        let now = Instant::now();
        self.maybe_sweep(now);
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::new("0", None));

        if !entry.is_live(now) {
            *entry = Entry::new("0", None);
        }

        let current: i64 = entry
            .value
            .parse()
            .map_err(|_| CacheError::Backend(format!("value at '{}' is not an integer", key)))?;
        let next = current + 1;
        entry.value = next.to_string();
        Ok(next)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        if let Some(mut entry) = self.entries.get_mut(key) {
            if entry.is_live(now) {
                entry.expires_at = Some(now + ttl);
            }
        }
        Ok(())
    }

    async fn del(&self, keys: &[&str]) -> Result<(), CacheError> {
        for key in keys {
            self.entries.remove(*key);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
