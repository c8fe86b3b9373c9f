//! medipill - medication schedule tracking API
//!
//! Users register, log in and manage their medication schedules. Sessions
//! use short-lived access tokens and revocable refresh tokens; repeated
//! failed logins lock an account for a while.
//!
//! # Modules
//!
//! - [`config`] - YAML configuration with environment overrides
//! - [`logging`] - tracing subscriber setup
//! - [`db`] - PostgreSQL pool and schema
//! - [`store`] - user and medication storage (PostgreSQL or in-memory)
//! - [`cache`] - volatile key/value cache (Redis or in-memory)
//! - [`audit`] - audit trail
//! - [`user_auth`] - passwords, lockout, tokens, revocation, sessions
//! - [`gateway`] - HTTP router, handlers and OpenAPI document

pub mod audit;
pub mod cache;
pub mod config;
pub mod db;
pub mod gateway;
pub mod logging;
pub mod store;
pub mod user_auth;

pub use config::AppConfig;
pub use gateway::state::AppState;
