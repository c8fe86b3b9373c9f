//! Shared fixtures for integration tests: in-memory collaborators and
//! backends that are always down.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use medipill::audit::MemoryAuditLog;
use medipill::cache::{Cache, CacheError, MemoryCache};
use medipill::config::{AuthConfig, LockoutConfig};
use medipill::store::{
    MedicationStore, MemoryStore, NewUser, ProfileUpdate, StoreError, User, UserId, UserStore,
};
use medipill::user_auth::service::RegisterRequest;
use medipill::user_auth::{ClientInfo, Clock, UserAuthService};
use medipill::AppState;

/// Clock that only moves when a test advances it
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, by: chrono::Duration) {
        *self.0.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

pub const SECRET: &str = "integration-test-secret";

pub fn auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: SECRET.to_string(),
        access_ttl_secs: 3600,
        refresh_ttl_secs: 7 * 24 * 3600,
        lockout: LockoutConfig::default(),
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.timestamp_opt(1_750_000_000, 0).unwrap()
}

pub fn client() -> ClientInfo {
    ClientInfo {
        ip: "127.0.0.1".to_string(),
        user_agent: "integration-test".to_string(),
    }
}

pub fn register_request(username: &str, email: &str, password: &str) -> RegisterRequest {
    RegisterRequest {
        username: username.to_string(),
        email: email.to_string(),
        password: password.to_string(),
    }
}

pub struct Harness {
    pub service: UserAuthService,
    pub store: Arc<MemoryStore>,
    pub cache: Arc<MemoryCache>,
    pub audit: Arc<MemoryAuditLog>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(MemoryCache::new());
        let audit = Arc::new(MemoryAuditLog::new());
        let clock = Arc::new(ManualClock::new(start_time()));
        let service = UserAuthService::new(store.clone(), cache.clone(), audit.clone(), &auth_config())
            .with_clock(clock.clone());
        Self {
            service,
            store,
            cache,
            audit,
            clock,
        }
    }
}

/// Full application state over in-memory backends, with a manual clock.
pub fn app_state() -> (Arc<AppState>, Arc<MemoryAuditLog>, Arc<ManualClock>) {
    let audit = Arc::new(MemoryAuditLog::new());
    let clock = Arc::new(ManualClock::new(start_time()));
    let state = AppState::new(
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryCache::new()),
        audit.clone(),
        &auth_config(),
    )
    .with_clock(clock.clone());
    (Arc::new(state), audit, clock)
}

/// Cache whose every call times out
pub struct DownCache;

#[async_trait]
impl Cache for DownCache {
    fn name(&self) -> &'static str {
        "down"
    }
    async fn get(&self, _: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Timeout)
    }
    async fn set_ex(&self, _: &str, _: &str, _: Duration) -> Result<(), CacheError> {
        Err(CacheError::Timeout)
    }
    async fn incr(&self, _: &str) -> Result<i64, CacheError> {
        Err(CacheError::Timeout)
    }
    async fn expire(&self, _: &str, _: Duration) -> Result<(), CacheError> {
        Err(CacheError::Timeout)
    }
    async fn del(&self, _: &[&str]) -> Result<(), CacheError> {
        Err(CacheError::Timeout)
    }
    async fn ping(&self) -> Result<(), CacheError> {
        Err(CacheError::Timeout)
    }
}

/// Cache that accepts every call and never answers
pub struct HungCache;

async fn hang() {
    tokio::time::sleep(Duration::from_secs(3600)).await;
}

#[async_trait]
impl Cache for HungCache {
    fn name(&self) -> &'static str {
        "hung"
    }
    async fn get(&self, _: &str) -> Result<Option<String>, CacheError> {
        hang().await;
        Ok(None)
    }
    async fn set_ex(&self, _: &str, _: &str, _: Duration) -> Result<(), CacheError> {
        hang().await;
        Ok(())
    }
    async fn incr(&self, _: &str) -> Result<i64, CacheError> {
        hang().await;
        Ok(1)
    }
    async fn expire(&self, _: &str, _: Duration) -> Result<(), CacheError> {
        hang().await;
        Ok(())
    }
    async fn del(&self, _: &[&str]) -> Result<(), CacheError> {
        hang().await;
        Ok(())
    }
    async fn ping(&self) -> Result<(), CacheError> {
        hang().await;
        Ok(())
    }
}

/// Store whose every call reports the database as unreachable
pub struct DownStore;

fn down() -> StoreError {
    StoreError::Unavailable("connection refused".to_string())
}

#[async_trait]
impl UserStore for DownStore {
    fn name(&self) -> &'static str {
        "down"
    }
    async fn create_user(&self, _: NewUser) -> Result<User, StoreError> {
        Err(down())
    }
    async fn find_by_email(&self, _: &str) -> Result<Option<User>, StoreError> {
        Err(down())
    }
    async fn find_by_id(&self, _: UserId) -> Result<Option<User>, StoreError> {
        Err(down())
    }
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Err(down())
    }
    async fn update_profile(&self, _: UserId, _: ProfileUpdate) -> Result<User, StoreError> {
        Err(down())
    }
    async fn update_password(&self, _: UserId, _: &str, _: DateTime<Utc>) -> Result<(), StoreError> {
        Err(down())
    }
    async fn delete_user(&self, _: UserId) -> Result<(), StoreError> {
        Err(down())
    }
    async fn ping(&self) -> Result<(), StoreError> {
        Err(down())
    }
}

#[async_trait]
impl MedicationStore for DownStore {
    async fn create_medication(
        &self,
        _: UserId,
        _: medipill::store::NewMedication,
    ) -> Result<medipill::store::Medication, StoreError> {
        Err(down())
    }
    async fn list_medications(&self, _: UserId) -> Result<Vec<medipill::store::Medication>, StoreError> {
        Err(down())
    }
    async fn find_medication(
        &self,
        _: UserId,
        _: medipill::store::MedicationId,
    ) -> Result<Option<medipill::store::Medication>, StoreError> {
        Err(down())
    }
    async fn update_medication(
        &self,
        _: UserId,
        _: medipill::store::MedicationId,
        _: medipill::store::MedicationPatch,
    ) -> Result<medipill::store::Medication, StoreError> {
        Err(down())
    }
    async fn delete_medication(
        &self,
        _: UserId,
        _: medipill::store::MedicationId,
    ) -> Result<(), StoreError> {
        Err(down())
    }
}
