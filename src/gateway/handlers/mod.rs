pub mod health;
pub mod medications;
pub mod users;

pub use health::{HealthResponse, health_check};
pub use medications::{
    CreateMedicationRequest, UpdateMedicationRequest, create_medication, delete_medication,
    get_medication, list_medications, update_medication,
};
pub use users::{UpdateUserRequest, UpdateUserResponse, delete_user, get_user, list_users, update_user};
