//! User management backend library
//!
//! Token-based authentication and authorization for a user-management API,
//! exposed for the server binary and the integration tests.

pub mod app;
pub mod auth;
pub mod config;
pub mod middleware;

pub use app::build_router;
pub use config::Config;
