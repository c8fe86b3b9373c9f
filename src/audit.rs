//! Audit trail for security-relevant actions
//!
//! Appends are fire-and-forget: a failing sink never fails the request that
//! produced the event.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Mutex;

use crate::store::UserId;

pub mod action {
    pub const REGISTER: &str = "register";
    pub const LOGIN: &str = "login";
    pub const LOGIN_FAILED: &str = "login_failed";
    pub const LOGOUT: &str = "logout";
    pub const REFRESH: &str = "refresh";
    pub const PASSWORD_CHANGE: &str = "password_change";
    pub const PROFILE_UPDATE: &str = "profile_update";
    pub const USER_DELETE: &str = "user_delete";
    pub const MEDICATION_CREATE: &str = "medication_create";
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    pub user_id: Option<UserId>,
    pub action: &'static str,
    pub detail: String,
    pub ip: String,
    pub user_agent: String,
    pub timestamp: DateTime<Utc>,
}

pub trait AuditLog: Send + Sync {
    /// Must not block the caller on I/O
    fn append(&self, event: AuditEvent);
}

/// Writes events to the `audit_logs` table on a spawned task.
pub struct PgAuditLog {
    pool: PgPool,
}

impl PgAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl AuditLog for PgAuditLog {
    fn append(&self, event: AuditEvent) {
        let pool = self.pool.clone();
        tokio::spawn(async move {
            let result = sqlx::query(
                "INSERT INTO audit_logs (user_id, action, detail, ip, user_agent, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(event.user_id)
            .bind(event.action)
            .bind(&event.detail)
            .bind(&event.ip)
            .bind(&event.user_agent)
            .bind(event.timestamp)
            .execute(&pool)
            .await;

            if let Err(e) = result {
                tracing::warn!(action = event.action, error = %e, "Failed to persist audit event");
            }
        });
    }
}

/// Emits events as structured log lines. Used when no database is configured.
pub struct TracingAuditLog;

impl AuditLog for TracingAuditLog {
    fn append(&self, event: AuditEvent) {
        tracing::info!(
            target: "audit",
            user_id = ?event.user_id,
            action = event.action,
            detail = %event.detail,
            ip = %event.ip,
            user_agent = %event.user_agent,
            "audit"
        );
    }
}

/// Keeps events in memory so tests can assert on them.
#[derive(Default)]
pub struct MemoryAuditLog {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn actions(&self) -> Vec<&'static str> {
        self.events().into_iter().map(|e| e.action).collect()
    }
}

impl AuditLog for MemoryAuditLog {
    fn append(&self, event: AuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
