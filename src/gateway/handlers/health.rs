//! Health check handler

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::state::AppState;

/// Dependency status: `ok`, `not_connected` (running on the in-memory
/// backend) or `error`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    pub message: String,
    #[schema(example = "ok")]
    pub database: String,
    #[schema(example = "ok")]
    pub cache: String,
}

fn dependency_status<E: std::fmt::Display>(backend: &str, result: Result<(), E>) -> String {
    match result {
        _ if backend == "memory" => "not_connected".to_string(),
        Ok(()) => "ok".to_string(),
        Err(e) => {
            tracing::error!("[HEALTH] {} ping failed: {}", backend, e);
            "error".to_string()
        }
    }
}

/// Health check endpoint
///
/// Always 200; dependency problems are reported in the body.
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service running", body = HealthResponse)
    ),
    tag = "System"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let (store, cache) = tokio::join!(state.users.ping(), state.cache.ping());

    Json(HealthResponse {
        status: "ok".to_string(),
        message: "medipill API is running".to_string(),
        database: dependency_status(state.users.name(), store),
        cache: dependency_status(state.cache.name(), cache),
    })
}
