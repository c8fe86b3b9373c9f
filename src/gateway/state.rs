use std::sync::Arc;

use crate::audit::AuditLog;
use crate::cache::Cache;
use crate::config::AuthConfig;
use crate::store::{MedicationStore, UserStore};
use crate::user_auth::{Clock, UserAuthService};

/// Gateway application state (shared)
pub struct AppState {
    /// Session core
    pub auth: UserAuthService,
    pub users: Arc<dyn UserStore>,
    pub medications: Arc<dyn MedicationStore>,
    /// Lockout counters and the refresh-token denylist
    pub cache: Arc<dyn Cache>,
    pub audit: Arc<dyn AuditLog>,
}

impl AppState {
    /// Build the state around one store that backs both users and medications.
    pub fn new<S>(
        store: Arc<S>,
        cache: Arc<dyn Cache>,
        audit: Arc<dyn AuditLog>,
        config: &AuthConfig,
    ) -> Self
    where
        S: UserStore + MedicationStore + 'static,
    {
        let users: Arc<dyn UserStore> = store.clone();
        let medications: Arc<dyn MedicationStore> = store;
        Self {
            auth: UserAuthService::new(users.clone(), cache.clone(), audit.clone(), config),
            users,
            medications,
            cache,
            audit,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.auth = self.auth.with_clock(clock);
        self
    }
}
