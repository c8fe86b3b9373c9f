//! User profile handlers. Updates and deletes are limited to the caller's
//! own account.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, ErrorResponse, ValidJson};
use crate::audit::{AuditEvent, action};
use crate::store::{ProfileUpdate, UserId, UserProfile};
use crate::user_auth::{AuthenticatedUser, ClientInfo};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 3, max = 32))]
    pub username: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    /// Setting a password invalidates older password-change tokens
    #[validate(length(min = 6, max = 64))]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum UpdateUserResponse {
    PasswordChanged {
        user: UserProfile,
        token: String,
        message: String,
    },
    Profile(UserProfile),
}

fn ensure_self(user: &AuthenticatedUser, id: UserId) -> ApiResult<()> {
    if user.user_id != id {
        tracing::warn!(caller = user.user_id, requested = id, "Rejected change to another user's account");
        return Err(ApiError::forbidden("You can only modify your own account"));
    }
    Ok(())
}

/// List users
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "All active users", body = Vec<UserProfile>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
) -> ApiResult<Json<Vec<UserProfile>>> {
    let users = state.users.list_users().await?;
    Ok(Json(users.iter().map(|u| u.profile()).collect()))
}

/// Get a user profile
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User profile", body = UserProfile),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(id): Path<UserId>,
) -> ApiResult<Json<UserProfile>> {
    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(user.profile()))
}

/// Update own profile, optionally changing the password
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated profile, plus a new token when the password changed", body = UpdateUserResponse),
        (status = 403, description = "Not the caller's account", body = ErrorResponse),
        (status = 409, description = "Username or email already exists", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    client: ClientInfo,
    Path(id): Path<UserId>,
    ValidJson(req): ValidJson<UpdateUserRequest>,
) -> ApiResult<Json<UpdateUserResponse>> {
    ensure_self(&user, id)?;

    let update = ProfileUpdate {
        username: req.username,
        email: req.email,
    };
    let record = if update.is_empty() {
        state
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))?
    } else {
        let updated = state.users.update_profile(id, update).await.map_err(|e| {
            if let crate::store::StoreError::NotFound = e {
                ApiError::not_found("User not found")
            } else {
                e.into()
            }
        })?;
        state.audit.append(AuditEvent {
            user_id: Some(id),
            action: action::PROFILE_UPDATE,
            detail: "Profile updated".to_string(),
            ip: client.ip.clone(),
            user_agent: client.user_agent.clone(),
            timestamp: state.auth.now(),
        });
        updated
    };

    match req.password {
        Some(password) => {
            let token = state.auth.change_password(id, &password, &client).await?;
            // re-read so the profile carries the new password_changed_at
            let record = state
                .users
                .find_by_id(id)
                .await?
                .ok_or_else(|| ApiError::not_found("User not found"))?;
            Ok(Json(UpdateUserResponse::PasswordChanged {
                user: record.profile(),
                token,
                message: "Password changed, please use the new token.".to_string(),
            }))
        }
        None => Ok(Json(UpdateUserResponse::Profile(record.profile()))),
    }
}

/// Soft-delete own account
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not the caller's account", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    client: ClientInfo,
    Path(id): Path<UserId>,
) -> ApiResult<StatusCode> {
    ensure_self(&user, id)?;
    state.users.delete_user(id).await?;

    state.audit.append(AuditEvent {
        user_id: Some(id),
        action: action::USER_DELETE,
        detail: "Account deleted".to_string(),
        ip: client.ip,
        user_agent: client.user_agent,
        timestamp: state.auth.now(),
    });
    Ok(StatusCode::NO_CONTENT)
}
