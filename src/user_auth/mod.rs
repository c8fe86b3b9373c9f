//! User authentication and session management
//!
//! - `password`: Argon2id hashing
//! - `lockout`: failed-login counting and temporary lock
//! - `token`: HS256 access/refresh tokens
//! - `revocation`: refresh-token denylist
//! - `service`: login, logout, refresh, password change, authenticate
//! - `extract`: `AuthenticatedUser` and `ClientInfo` extractors

pub mod error;
pub mod extract;
pub mod handlers;
pub mod lockout;
pub mod password;
pub mod revocation;
pub mod service;
pub mod token;

pub use error::AuthError;
pub use extract::{AuthenticatedUser, ClientInfo};
pub use service::{Clock, SystemClock, UserAuthService};
pub use token::{AccessToken, TokenError, TokenKeys};
