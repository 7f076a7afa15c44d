//! Middleware for observability.
//!
//! Auth gates live in [`crate::auth::middleware`]; this module holds the
//! cross-cutting request logging.

pub mod logging;

pub use logging::request_logging;
