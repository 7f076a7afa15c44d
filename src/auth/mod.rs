//! Authentication Module
//! Mission: Signed session tokens, credential checks, role gates and ownership rules

pub mod api;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod ownership;
pub mod password;
pub mod user_store;

pub use api::{AuthState, PageLimits};
pub use jwt::{JwtHandler, TokenError};
pub use middleware::{auth_middleware, require_role};
pub use models::{Claims, User, UserRole};
pub use ownership::may_act;
pub use user_store::{StoreError, UserStore};
