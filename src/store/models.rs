//! Records owned by the durable store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

pub type UserId = i64;
pub type MedicationId = i64;

/// Lowercase and trim an email so lookups and uniqueness are case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// User account row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// Always normalized
    pub email: String,
    pub password_hash: String,
    pub password_changed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// True when the password was changed after `at`, at whole-second precision.
    pub fn password_changed_after(&self, at: DateTime<Utc>) -> bool {
        self.password_changed_at
            .is_some_and(|changed| changed.timestamp() > at.timestamp())
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            password_changed_at: self.password_changed_at,
            created_at: self.created_at,
        }
    }
}

/// Public view of a user. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    #[schema(example = 1)]
    pub id: UserId,
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_changed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Username/email changes; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none()
    }
}

// ============================================================================
// Medications
// ============================================================================

/// How often a medication is taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleType {
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

impl ScheduleType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl fmt::Display for ScheduleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScheduleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(format!("unknown schedule type '{}'", other)),
        }
    }
}

/// Medication kinds: 1 = medicine, 2 = injectable, 3 = other
pub mod medication_kind {
    pub const MEDICINE: i16 = 1;
    pub const INJECTABLE: i16 = 2;
    pub const OTHER: i16 = 3;
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Medication {
    pub id: MedicationId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    #[schema(example = 1)]
    pub kind: i16,
    #[schema(example = "Ibuprofen")]
    pub name: String,
    #[schema(example = "200mg")]
    pub dose: String,
    pub schedule_type: ScheduleType,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMedication {
    pub kind: i16,
    pub name: String,
    pub dose: String,
    pub schedule_type: ScheduleType,
    pub description: String,
}

/// Partial medication update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct MedicationPatch {
    pub kind: Option<i16>,
    pub name: Option<String>,
    pub dose: Option<String>,
    pub schedule_type: Option<ScheduleType>,
    pub description: Option<String>,
}

impl MedicationPatch {
    pub fn apply(self, med: &mut Medication) {
        if let Some(kind) = self.kind {
            med.kind = kind;
        }
        if let Some(name) = self.name {
            med.name = name;
        }
        if let Some(dose) = self.dose {
            med.dose = dose;
        }
        if let Some(schedule_type) = self.schedule_type {
            med.schedule_type = schedule_type;
        }
        if let Some(description) = self.description {
            med.description = description;
        }
    }
}
