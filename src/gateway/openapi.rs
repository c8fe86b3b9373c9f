//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::gateway::handlers::{
    CreateMedicationRequest, HealthResponse, UpdateMedicationRequest, UpdateUserRequest,
    UpdateUserResponse,
};
use crate::gateway::types::{ErrorResponse, MessageResponse};
use crate::store::{Medication, ScheduleType, UserProfile};
use crate::user_auth::service::{
    LoginRequest, LoginResponse, RefreshResponse, RefreshTokenRequest, RegisterRequest,
    RegisterResponse,
};

/// JWT bearer authentication security scheme
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Access token from /api/login, /api/refresh or a password change",
                        ))
                        .build(),
                ),
            );
        }
    }
}

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "medipill API",
        version = "1.0.0",
        description = "Users, medication schedules and session management.",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health::health_check,
        crate::user_auth::handlers::register,
        crate::user_auth::handlers::login,
        crate::user_auth::handlers::logout,
        crate::user_auth::handlers::refresh,
        crate::gateway::handlers::users::list_users,
        crate::gateway::handlers::users::get_user,
        crate::gateway::handlers::users::update_user,
        crate::gateway::handlers::users::delete_user,
        crate::gateway::handlers::medications::create_medication,
        crate::gateway::handlers::medications::list_medications,
        crate::gateway::handlers::medications::get_medication,
        crate::gateway::handlers::medications::update_medication,
        crate::gateway::handlers::medications::delete_medication,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorResponse,
            MessageResponse,
            RegisterRequest,
            RegisterResponse,
            LoginRequest,
            LoginResponse,
            RefreshTokenRequest,
            RefreshResponse,
            UserProfile,
            UpdateUserRequest,
            UpdateUserResponse,
            Medication,
            ScheduleType,
            CreateMedicationRequest,
            UpdateMedicationRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "System", description = "Health"),
        (name = "Auth", description = "Registration and sessions"),
        (name = "Users", description = "User profiles"),
        (name = "Medications", description = "Medication schedules")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_session_routes() {
        let doc = ApiDoc::openapi();
        for path in ["/api/login", "/api/logout", "/api/refresh", "/api/users/{id}"] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
        let schemes = doc.components.expect("components").security_schemes;
        assert!(schemes.contains_key("bearer_auth"));
    }
}
