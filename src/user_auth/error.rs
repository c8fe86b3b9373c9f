//! Session error taxonomy.
//!
//! Each kind maps to one HTTP status and one client-facing message. The
//! client never sees dependency or internal detail; that goes to the log.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use super::token::TokenError;
use crate::store::StoreError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("account locked")]
    Locked,

    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    Expired,

    #[error("token predates password change")]
    StaleToken,

    #[error("refresh token revoked")]
    Revoked,

    #[error("bearer token missing")]
    TokenRequired,

    /// Username or email already taken. Carries the field name.
    #[error("{0} already exists")]
    Conflict(&'static str),

    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get error name string.
    pub fn name(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Locked => "LOCKED",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::Expired => "EXPIRED",
            Self::StaleToken => "STALE_TOKEN",
            Self::Revoked => "REVOKED",
            Self::TokenRequired => "TOKEN_REQUIRED",
            Self::Conflict(_) => "CONFLICT",
            Self::DependencyUnavailable(_) => "DEPENDENCY_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code.
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Locked => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::DependencyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Message returned to the client
    pub fn message(&self) -> String {
        match self {
            Self::InvalidCredentials => "Invalid email or password".to_string(),
            Self::Locked => {
                "Account is locked due to too many failed login attempts. Please try again later."
                    .to_string()
            }
            Self::InvalidToken => "Invalid token".to_string(),
            Self::Expired => "Token has expired".to_string(),
            Self::StaleToken => "Token is no longer valid, please login again.".to_string(),
            Self::Revoked => "Refresh token has been revoked".to_string(),
            Self::TokenRequired => "Token required".to_string(),
            Self::Conflict(field) => format!("{} already exists", capitalize(field)),
            Self::DependencyUnavailable(_) => "Service temporarily unavailable".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl AuthError {
    /// Log the detail that `message()` withholds from the client.
    pub(crate) fn log_detail(&self) {
        match self {
            Self::DependencyUnavailable(detail) => {
                tracing::error!(detail = %detail, "Auth dependency unavailable")
            }
            Self::Internal(detail) => tracing::error!(detail = %detail, "Auth internal error"),
            _ => {}
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => AuthError::Expired,
            TokenError::InvalidSignature | TokenError::Malformed => AuthError::InvalidToken,
            TokenError::Signing(msg) => AuthError::Internal(msg),
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unique(field) => AuthError::Conflict(field),
            StoreError::Unavailable(msg) => AuthError::DependencyUnavailable(msg),
            StoreError::NotFound => AuthError::Internal("record not found".to_string()),
            StoreError::Other(msg) => AuthError::Internal(msg),
        }
    }
}

/// JSON response body for auth errors.
#[derive(Debug, Serialize)]
pub struct AuthErrorResponse {
    pub error: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log_detail();
        let body = AuthErrorResponse {
            error: self.message(),
        };
        (self.http_status(), Json(body)).into_response()
    }
}
