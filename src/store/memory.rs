//! In-memory store used by tests and when no PostgreSQL URL is configured.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use super::models::{
    Medication, MedicationId, MedicationPatch, NewMedication, NewUser, ProfileUpdate, User,
    UserId, normalize_email,
};
use super::{MedicationStore, StoreError, UserStore};

pub struct MemoryStore {
    users: DashMap<UserId, User>,
    medications: DashMap<MedicationId, Medication>,
    next_user_id: AtomicI64,
    next_medication_id: AtomicI64,
    /// Serializes uniqueness check + write for users
    write_lock: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            medications: DashMap::new(),
            next_user_id: AtomicI64::new(1),
            next_medication_id: AtomicI64::new(1),
            write_lock: Mutex::new(()),
        }
    }

    fn check_unique(
        &self,
        except: Option<UserId>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<(), StoreError> {
        for user in self.users.iter() {
            if Some(user.id) == except {
                continue;
            }
            if email.is_some_and(|e| user.email == e) {
                return Err(StoreError::Unique("email"));
            }
            if username.is_some_and(|u| user.username == u) {
                return Err(StoreError::Unique("username"));
            }
        }
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>, StoreError> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Other("memory store lock poisoned".to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let email = normalize_email(&user.email);
        let _guard = self.lock()?;
        self.check_unique(None, Some(&user.username), Some(&email))?;

        let now = Utc::now();
        let record = User {
            id: self.next_user_id.fetch_add(1, Ordering::SeqCst),
            username: user.username,
            email,
            password_hash: user.password_hash,
            password_changed_at: None,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = normalize_email(email);
        Ok(self
            .users
            .iter()
            .find(|u| u.email == email)
            .map(|u| u.value().clone()))
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.users.iter().map(|u| u.value().clone()).collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn update_profile(
        &self,
        id: UserId,
        update: ProfileUpdate,
    ) -> Result<User, StoreError> {
        let email = update.email.as_deref().map(normalize_email);
        let _guard = self.lock()?;
        self.check_unique(Some(id), update.username.as_deref(), email.as_deref())?;

        let mut user = self.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(username) = update.username {
            user.username = username;
        }
        if let Some(email) = email {
            user.email = email;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut user = self.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.password_hash = password_hash.to_string();
        user.password_changed_at = Some(match user.password_changed_at {
            Some(prev) if prev > changed_at => prev,
            _ => changed_at,
        });
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), StoreError> {
        self.users
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl MedicationStore for MemoryStore {
    async fn create_medication(
        &self,
        user_id: UserId,
        med: NewMedication,
    ) -> Result<Medication, StoreError> {
        let now = Utc::now();
        let record = Medication {
            id: self.next_medication_id.fetch_add(1, Ordering::SeqCst),
            user_id,
            kind: med.kind,
            name: med.name,
            dose: med.dose,
            schedule_type: med.schedule_type,
            description: med.description,
            created_at: now,
            updated_at: now,
        };
        self.medications.insert(record.id, record.clone());
        Ok(record)
    }

    async fn list_medications(&self, user_id: UserId) -> Result<Vec<Medication>, StoreError> {
        let mut meds: Vec<Medication> = self
            .medications
            .iter()
            .filter(|m| m.user_id == user_id)
            .map(|m| m.value().clone())
            .collect();
        meds.sort_by_key(|m| m.id);
        Ok(meds)
    }

    async fn find_medication(
        &self,
        user_id: UserId,
        id: MedicationId,
    ) -> Result<Option<Medication>, StoreError> {
        Ok(self
            .medications
            .get(&id)
            .filter(|m| m.user_id == user_id)
            .map(|m| m.value().clone()))
    }

    async fn update_medication(
        &self,
        user_id: UserId,
        id: MedicationId,
        patch: MedicationPatch,
    ) -> Result<Medication, StoreError> {
        let mut med = self
            .medications
            .get_mut(&id)
            .filter(|m| m.user_id == user_id)
            .ok_or(StoreError::NotFound)?;
        patch.apply(&mut med);
        med.updated_at = Utc::now();
        Ok(med.clone())
    }

    async fn delete_medication(
        &self,
        user_id: UserId,
        id: MedicationId,
    ) -> Result<(), StoreError> {
        self.medications
            .remove_if(&id, |_, m| m.user_id == user_id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}
