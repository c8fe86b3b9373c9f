//! Redis-backed cache shared by every gateway instance.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;

use super::{Cache, CacheError, bounded};

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        CacheError::Backend(e.to_string())
    }
}

/// Redis client. `ConnectionManager` reconnects on its own and is cheap to
/// clone, so every command runs on a clone.
///
/// Commands carry no deadline of their own; wrap in
/// [`TimedCache`](super::TimedCache) to bound them.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    /// Connect to `url`, giving up after `connect_timeout`.
    pub async fn connect(url: &str, connect_timeout: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let conn = bounded(connect_timeout, async {
            Ok::<_, CacheError>(ConnectionManager::new(client).await?)
        })
        .await?;

        tracing::info!("Redis connection established");
        Ok(Self { conn })
    }
}

/// Redis rejects zero-second expiries
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl Cache for RedisCache {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        Ok(conn.get::<_, Option<String>>(key).await?)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        Ok(conn.set_ex::<_, _, ()>(key, value, ttl_secs(ttl)).await?)
    }

    async fn incr(&self, key: &str) -> Result<i64, CacheError> {
        let mut conn = self.conn.clone();
        Ok(conn.incr::<_, _, i64>(key, 1).await?)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let secs = ttl_secs(ttl) as i64;
        Ok(conn.expire::<_, ()>(key, secs).await?)
    }

    async fn del(&self, keys: &[&str]) -> Result<(), CacheError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        Ok(conn.del::<_, ()>(keys.to_vec()).await?)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}
