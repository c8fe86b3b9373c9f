//! Volatile key/value cache
//!
//! Holds login-attempt counters, lockout flags and the refresh-token denylist.
//! Everything stored here may be lost; callers fail open on errors.
//!
//! - `memory`: DashMap-backed implementation (tests, single-process dev)
//! - `redis`: shared Redis implementation for multi-instance deployments
//! - `timed`: per-operation deadline around any backend

pub mod memory;
pub mod redis;
pub mod timed;

pub use self::memory::MemoryCache;
pub use self::redis::RedisCache;
pub use self::timed::{TimedCache, bounded};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache operation timed out")]
    Timeout,

    #[error("cache backend error: {0}")]
    Backend(String),
}

/// Cache operations the auth core relies on.
///
/// `incr` must be atomic per key: concurrent increments never lose a count.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Backend name for logging and health output
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Set `key` to `value`, expiring after `ttl`
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Increment the integer at `key`, creating it at 1 without expiry if absent
    async fn incr(&self, key: &str) -> Result<i64, CacheError>;

    /// Set the expiry of an existing key. No-op when the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn del(&self, keys: &[&str]) -> Result<(), CacheError>;

    async fn ping(&self) -> Result<(), CacheError>;
}
