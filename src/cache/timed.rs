//! Per-operation deadline for any [`Cache`] backend.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use super::{Cache, CacheError};

/// Run `fut`, giving up with [`CacheError::Timeout`] after `limit`.
pub async fn bounded<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T, CacheError>>,
) -> Result<T, CacheError> {
    tokio::time::timeout(limit, fut)
        .await
        .unwrap_or(Err(CacheError::Timeout))
}

/// Wraps a backend so a hung connection fails fast instead of stalling the
/// request.
pub struct TimedCache<C> {
    inner: C,
    op_timeout: Duration,
}

impl<C: Cache> TimedCache<C> {
    pub fn new(inner: C, op_timeout: Duration) -> Self {
        Self { inner, op_timeout }
    }
}

#[async_trait]
impl<C: Cache> Cache for TimedCache<C> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        bounded(self.op_timeout, self.inner.get(key)).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        bounded(self.op_timeout, self.inner.set_ex(key, value, ttl)).await
    }

    async fn incr(&self, key: &str) -> Result<i64, CacheError> {
        bounded(self.op_timeout, self.inner.incr(key)).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), CacheError> {
        bounded(self.op_timeout, self.inner.expire(key, ttl)).await
    }

    async fn del(&self, keys: &[&str]) -> Result<(), CacheError> {
        bounded(self.op_timeout, self.inner.del(keys)).await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        bounded(self.op_timeout, self.inner.ping()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    #[tokio::test(start_paused = true)]
    async fn test_bounded_times_out_pending_future() {
        let started = tokio::time::Instant::now();
        let res: Result<(), _> =
            bounded(Duration::from_millis(500), std::future::pending()).await;

        assert!(matches!(res, Err(CacheError::Timeout)));
        assert!(started.elapsed() >= Duration::from_millis(500));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_bounded_passes_through_result() {
        let ok = bounded(Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err: Result<(), _> = bounded(Duration::from_secs(1), async {
            Err(CacheError::Backend("refused".to_string()))
        })
        .await;
        assert!(matches!(err, Err(CacheError::Backend(_))));
    }

    #[tokio::test]
    async fn test_timed_cache_delegates() {
        let cache = TimedCache::new(MemoryCache::new(), Duration::from_secs(1));
        assert_eq!(cache.name(), "memory");
        assert_eq!(cache.incr("n").await.unwrap(), 1);
        assert_eq!(cache.get("n").await.unwrap().as_deref(), Some("1"));
    }
}
