use axum::{Json, extract::State, http::StatusCode};
use std::sync::Arc;

use super::extract::{AuthenticatedUser, ClientInfo};
use super::service::{
    LoginRequest, LoginResponse, RefreshResponse, RefreshTokenRequest, RegisterRequest,
    RegisterResponse,
};
use crate::gateway::state::AppState;
use crate::gateway::types::{ApiResult, ErrorResponse, MessageResponse, ValidJson};

/// Register a new user
///
/// POST /api/register
#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = RegisterResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Username or email already exists", body = ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    client: ClientInfo,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let user = state.auth.register(req, &client).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: user.id,
            username: user.username,
            email: user.email,
        }),
    ))
}

/// Login user
///
/// POST /api/login
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 403, description = "Account locked", body = ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    client: ClientInfo,
    ValidJson(req): ValidJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let tokens = state.auth.login(&req.email, &req.password, &client).await?;
    Ok(Json(tokens))
}

/// Revoke a refresh token
///
/// POST /api/logout
#[utoipa::path(
    post,
    path = "/api/logout",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Missing bearer or invalid refresh token", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    client: ClientInfo,
    ValidJson(req): ValidJson<RefreshTokenRequest>,
) -> ApiResult<Json<MessageResponse>> {
    state.auth.logout(&user, &req.refresh_token, &client).await?;
    Ok(Json(MessageResponse::new("Logged out successfully")))
}

/// Exchange a refresh token for a new access token
///
/// POST /api/refresh
#[utoipa::path(
    post,
    path = "/api/refresh",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New access token", body = RefreshResponse),
        (status = 401, description = "Invalid or revoked refresh token", body = ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    client: ClientInfo,
    ValidJson(req): ValidJson<RefreshTokenRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let access_token = state.auth.refresh(&req.refresh_token, &client).await?;
    Ok(Json(RefreshResponse { access_token }))
}
