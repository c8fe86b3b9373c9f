//! Medication schedule handlers, scoped to the authenticated user.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, ErrorResponse, ValidJson};
use crate::audit::{AuditEvent, action};
use crate::store::models::medication_kind;
use crate::store::{Medication, MedicationId, MedicationPatch, NewMedication, ScheduleType};
use crate::user_auth::{AuthenticatedUser, ClientInfo};

fn default_kind() -> i16 {
    medication_kind::MEDICINE
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateMedicationRequest {
    /// 1 = medicine, 2 = injectable, 3 = other
    #[serde(rename = "type", default = "default_kind")]
    #[validate(range(min = 1, max = 3))]
    #[schema(example = 1)]
    pub kind: i16,
    #[validate(length(min = 1, max = 255))]
    #[schema(example = "Ibuprofen")]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    #[schema(example = "200mg")]
    pub dose: String,
    pub schedule_type: ScheduleType,
    #[serde(default)]
    pub description: String,
}

/// Absent fields are left unchanged
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateMedicationRequest {
    #[serde(rename = "type")]
    #[validate(range(min = 1, max = 3))]
    pub kind: Option<i16>,
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub dose: Option<String>,
    pub schedule_type: Option<ScheduleType>,
    pub description: Option<String>,
}

fn not_found() -> ApiError {
    ApiError::not_found("Medication not found")
}

/// Create a medication
#[utoipa::path(
    post,
    path = "/api/medications",
    request_body = CreateMedicationRequest,
    responses(
        (status = 201, description = "Created", body = Medication),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Medications"
)]
pub async fn create_medication(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    client: ClientInfo,
    ValidJson(req): ValidJson<CreateMedicationRequest>,
) -> ApiResult<(StatusCode, Json<Medication>)> {
    let med = state
        .medications
        .create_medication(
            user.user_id,
            NewMedication {
                kind: req.kind,
                name: req.name,
                dose: req.dose,
                schedule_type: req.schedule_type,
                description: req.description,
            },
        )
        .await?;

    state.audit.append(AuditEvent {
        user_id: Some(user.user_id),
        action: action::MEDICATION_CREATE,
        detail: format!("Medication {} created", med.id),
        ip: client.ip,
        user_agent: client.user_agent,
        timestamp: state.auth.now(),
    });
    Ok((StatusCode::CREATED, Json(med)))
}

/// List own medications
#[utoipa::path(
    get,
    path = "/api/medications",
    responses(
        (status = 200, description = "Medications of the caller", body = Vec<Medication>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Medications"
)]
pub async fn list_medications(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> ApiResult<Json<Vec<Medication>>> {
    Ok(Json(state.medications.list_medications(user.user_id).await?))
}

/// Get one medication
#[utoipa::path(
    get,
    path = "/api/medications/{id}",
    params(("id" = i64, Path, description = "Medication ID")),
    responses(
        (status = 200, description = "Medication", body = Medication),
        (status = 404, description = "Not found or owned by another user", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Medications"
)]
pub async fn get_medication(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<MedicationId>,
) -> ApiResult<Json<Medication>> {
    state
        .medications
        .find_medication(user.user_id, id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

/// Update a medication
#[utoipa::path(
    put,
    path = "/api/medications/{id}",
    params(("id" = i64, Path, description = "Medication ID")),
    request_body = UpdateMedicationRequest,
    responses(
        (status = 200, description = "Updated medication", body = Medication),
        (status = 404, description = "Not found or owned by another user", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Medications"
)]
pub async fn update_medication(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<MedicationId>,
    ValidJson(req): ValidJson<UpdateMedicationRequest>,
) -> ApiResult<Json<Medication>> {
    let patch = MedicationPatch {
        kind: req.kind,
        name: req.name,
        dose: req.dose,
        schedule_type: req.schedule_type,
        description: req.description,
    };
    match state.medications.update_medication(user.user_id, id, patch).await {
        Ok(med) => Ok(Json(med)),
        Err(crate::store::StoreError::NotFound) => Err(not_found()),
        Err(e) => Err(e.into()),
    }
}

/// Delete a medication
#[utoipa::path(
    delete,
    path = "/api/medications/{id}",
    params(("id" = i64, Path, description = "Medication ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found or owned by another user", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Medications"
)]
pub async fn delete_medication(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<MedicationId>,
) -> ApiResult<StatusCode> {
    match state.medications.delete_medication(user.user_id, id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(crate::store::StoreError::NotFound) => Err(not_found()),
        Err(e) => Err(e.into()),
    }
}
