//! Refresh-token denylist
//!
//! Entries are keyed by the SHA-256 of the raw token so the cache never holds
//! a usable credential, and they expire when the token itself would.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::cache::{Cache, CacheError};

const REVOKED_PREFIX: &str = "blrt:";

fn revoked_key(token: &str) -> String {
    format!("{}{}", REVOKED_PREFIX, hex::encode(Sha256::digest(token.as_bytes())))
}

pub struct RevocationStore {
    cache: Arc<dyn Cache>,
}

impl RevocationStore {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }

    /// Deny `token` until `expires_at`. No-op when it has already expired.
    pub async fn revoke(
        &self,
        token: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let remaining = match (expires_at - now).to_std() {
            Ok(d) if !d.is_zero() => d,
            _ => return Ok(()),
        };
        self.cache.set_ex(&revoked_key(token), "1", remaining).await
    }

    /// Cache errors count as "not revoked".
    pub async fn is_revoked(&self, token: &str) -> bool {
        match self.cache.get(&revoked_key(token)).await {
            Ok(entry) => entry.is_some(),
            Err(e) => {
                tracing::warn!(error = %e, "Revocation check failed, treating token as live");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use chrono::Duration;

    #[test]
    fn test_key_does_not_contain_token() {
        let key = revoked_key("header.payload.signature");
        assert!(key.starts_with("blrt:"));
        assert!(!key.contains("payload"));
        assert_eq!(key.len(), REVOKED_PREFIX.len() + 64);
    }

    #[tokio::test(start_paused = true)]
    async fn test_revocation_expires_with_token() {
        let cache = Arc::new(MemoryCache::new());
        let store = RevocationStore::new(cache.clone());
        let now = Utc::now();

        store
            .revoke("tok", now + Duration::seconds(120), now)
            .await
            .unwrap();
        assert!(store.is_revoked("tok").await);
        assert!(!store.is_revoked("other").await);
        assert_eq!(
            cache.ttl(&revoked_key("tok")),
            Some(std::time::Duration::from_secs(120))
        );

        tokio::time::advance(std::time::Duration::from_secs(121)).await;
        assert!(!store.is_revoked("tok").await);
    }

    #[tokio::test]
    async fn test_revoking_expired_token_is_noop() {
        let cache = Arc::new(MemoryCache::new());
        let store = RevocationStore::new(cache.clone());
        let now = Utc::now();

        store
            .revoke("tok", now - Duration::seconds(1), now)
            .await
            .unwrap();
        store.revoke("tok2", now, now).await.unwrap();
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_revocations_do_not_accumulate() {
        let cache = Arc::new(MemoryCache::new());
        let store = RevocationStore::new(cache.clone());
        let now = Utc::now();

        for i in 0..1000 {
            store
                .revoke(&format!("tok-{}", i), now + Duration::seconds(60), now)
                .await
                .unwrap();
        }
        assert_eq!(cache.len(), 1000);

        tokio::time::advance(std::time::Duration::from_secs(3600)).await;
        let later = now + Duration::seconds(3600);
        for i in 0..10 {
            store
                .revoke(&format!("late-{}", i), later + Duration::seconds(60), later)
                .await
                .unwrap();
        }

        assert_eq!(cache.len(), 10);
        assert!(store.is_revoked("late-0").await);
        assert!(!store.is_revoked("tok-0").await);
    }
}
