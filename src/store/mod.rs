//! Durable storage for users and medications
//!
//! The auth core and the handlers only see the [`UserStore`] and
//! [`MedicationStore`] traits. Adapters classify their failures into
//! [`StoreError`] so callers never inspect driver error text.

pub mod memory;
pub mod models;
pub mod postgres;

pub use memory::MemoryStore;
pub use models::{
    Medication, MedicationId, MedicationPatch, NewMedication, NewUser, ProfileUpdate,
    ScheduleType, User, UserId, UserProfile, normalize_email,
};
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write. Carries the field name.
    #[error("{0} already exists")]
    Unique(&'static str),

    #[error("record not found")]
    NotFound,

    /// Connection failure, pool exhaustion or timeout
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store error: {0}")]
    Other(String),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// Insert a user. `Unique("email" | "username")` on collision.
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    /// Case-insensitive lookup
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    async fn update_profile(&self, id: UserId, update: ProfileUpdate)
    -> Result<User, StoreError>;

    /// Replace the password hash and stamp `password_changed_at`.
    /// The stamp never moves backwards.
    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Soft delete
    async fn delete_user(&self, id: UserId) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// Medications are always scoped to their owner.
#[async_trait]
pub trait MedicationStore: Send + Sync {
    async fn create_medication(
        &self,
        user_id: UserId,
        med: NewMedication,
    ) -> Result<Medication, StoreError>;

    async fn list_medications(&self, user_id: UserId) -> Result<Vec<Medication>, StoreError>;

    async fn find_medication(
        &self,
        user_id: UserId,
        id: MedicationId,
    ) -> Result<Option<Medication>, StoreError>;

    async fn update_medication(
        &self,
        user_id: UserId,
        id: MedicationId,
        patch: MedicationPatch,
    ) -> Result<Medication, StoreError>;

    async fn delete_medication(&self, user_id: UserId, id: MedicationId)
    -> Result<(), StoreError>;
}
