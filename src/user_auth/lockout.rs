//! Failed-login counting and temporary account lockout
//!
//! Per normalized email: `absent -> counting(n) -> locked`. The counter's
//! expiry is set once, on the first failure. The lock has its own expiry,
//! independent of the counting window. A successful login clears both.
//!
//! Cache failures fail open: the guard reports "not locked" and drops counts.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::Cache;
use crate::config::LockoutConfig;

const ATTEMPT_PREFIX: &str = "login_attempt:";
const LOCK_PREFIX: &str = "lock:";

fn attempt_key(email: &str) -> String {
    format!("{}{}", ATTEMPT_PREFIX, email)
}

fn lock_key(email: &str) -> String {
    format!("{}{}", LOCK_PREFIX, email)
}

pub struct LoginGuard {
    cache: Arc<dyn Cache>,
    max_attempts: i64,
    window: Duration,
    lock_duration: Duration,
}

impl LoginGuard {
    pub fn new(cache: Arc<dyn Cache>, config: &LockoutConfig) -> Self {
        Self {
            cache,
            max_attempts: config.max_attempts.max(1),
            window: config.window(),
            lock_duration: config.lock_duration(),
        }
    }

    pub async fn is_locked(&self, email: &str) -> bool {
        match self.cache.get(&lock_key(email)).await {
            Ok(flag) => flag.is_some(),
            Err(e) => {
                tracing::warn!(email, error = %e, "Lockout check failed, allowing login");
                false
            }
        }
    }

    /// Count a failed attempt. Returns true when this failure set the lock.
    pub async fn record_failure(&self, email: &str) -> bool {
        let key = attempt_key(email);
        let count = match self.cache.incr(&key).await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(email, error = %e, "Failed to count login attempt");
                return false;
            }
        };

        if count == 1 {
            if let Err(e) = self.cache.expire(&key, self.window).await {
                tracing::warn!(email, error = %e, "Failed to set attempt window");
            }
        }

        if count < self.max_attempts {
            return false;
        }

        match self
            .cache
            .set_ex(&lock_key(email), "1", self.lock_duration)
            .await
        {
            Ok(()) => {
                tracing::warn!(email, attempts = count, "Account locked after repeated failures");
                true
            }
            Err(e) => {
                tracing::warn!(email, error = %e, "Failed to set account lock");
                false
            }
        }
    }

    /// Clear the counter and any lock after a successful login.
    pub async fn reset(&self, email: &str) {
        let attempts = attempt_key(email);
        let lock = lock_key(email);
        if let Err(e) = self.cache.del(&[&attempts, &lock]).await {
            tracing::warn!(email, error = %e, "Failed to reset login attempts");
        }
    }
}
