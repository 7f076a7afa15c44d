//! Router assembly: public, authenticated and admin-only route groups.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::{
    auth::{api as auth_api, auth_middleware, require_role, AuthState, UserRole},
    middleware::request_logging,
};

/// Build the full HTTP application.
///
/// Admin routes carry the role gate as their own route layer and are then
/// merged under the authentication gate, so a request meets the
/// authentication gate first.
pub fn build_router(state: AuthState) -> Router {
    let admin_routes = Router::new()
        .route("/admin/users", get(auth_api::list_users))
        .route_layer(middleware::from_fn_with_state(UserRole::Admin, require_role));

    let protected_routes = Router::new()
        .route("/updateUser/:id", post(auth_api::update_user))
        .route("/me", get(auth_api::get_current_user))
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(
            state.jwt_handler.clone(),
            auth_middleware,
        ))
        .with_state(state.clone());

    let public_routes = Router::new()
        .route("/register", post(auth_api::register))
        .route("/login", post(auth_api::login))
        .route("/health", get(auth_api::health))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", protected_routes)
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive())
}
