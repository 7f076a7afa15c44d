//! Authentication API Endpoints
//! Mission: Registration, login, self-service updates and the admin listing

use crate::auth::{
    jwt::JwtHandler,
    models::{
        Claims, ErrorBody, LoginRequest, LoginResponse, Page, PageQuery, RegisterRequest,
        SessionResponse, UpdateUserRequest, UserResponse, UserRole,
    },
    ownership::may_act,
    password,
    user_store::{StoreError, UserStore},
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Minimum accepted password length at registration
pub const MIN_PASSWORD_LEN: usize = 8;

/// Bounds for the admin listing
#[derive(Debug, Clone, Copy)]
pub struct PageLimits {
    pub default_per_page: u32,
    pub max_per_page: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_per_page: 20,
            max_per_page: 100,
        }
    }
}

impl PageLimits {
    /// Resolve requested paging into `(page, per_page)`, both at least 1 and
    /// `per_page` never above the maximum.
    pub fn resolve(&self, query: &PageQuery) -> (u32, u32) {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query
            .per_page
            .unwrap_or(self.default_per_page)
            .clamp(1, self.max_per_page.max(1));
        (page, per_page)
    }
}

/// Shared auth state
#[derive(Clone)]
pub struct AuthState {
    pub user_store: Arc<UserStore>,
    pub jwt_handler: Arc<JwtHandler>,
    pub page_limits: PageLimits,
}

impl AuthState {
    pub fn new(
        user_store: Arc<UserStore>,
        jwt_handler: Arc<JwtHandler>,
        page_limits: PageLimits,
    ) -> Self {
        Self {
            user_store,
            jwt_handler,
            page_limits,
        }
    }
}

/// Health check - GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Register endpoint - POST /register
pub async fn register(
    State(state): State<AuthState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), AuthApiError> {
    let Json(payload) = payload.map_err(|e| {
        debug!("Rejected registration body: {}", e.body_text());
        AuthApiError::MalformedBody
    })?;

    validate_registration(&payload)?;

    let username = payload.username.trim().to_string();

    // bcrypt runs on the blocking pool
    let created = tokio::task::spawn_blocking({
        let store = state.user_store.clone();
        let username = username.clone();
        let email = payload.email.trim().to_string();
        move || store.create_user(&username, &email, &payload.password, UserRole::User)
    })
    .await
    .map_err(AuthApiError::internal)?;

    let user = created.map_err(|e| match e {
        StoreError::Conflict => {
            warn!("Registration conflict for username {}", username);
            AuthApiError::UserAlreadyExists
        }
        other => AuthApiError::internal(other),
    })?;

    Ok((StatusCode::CREATED, Json(UserResponse::from_user(&user))))
}

fn validate_registration(payload: &RegisterRequest) -> Result<(), AuthApiError> {
    if payload.username.trim().is_empty() {
        return Err(AuthApiError::InvalidField("Username is required"));
    }
    let email = payload.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AuthApiError::InvalidField("A valid email is required"));
    }
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthApiError::WeakPassword);
    }
    Ok(())
}

/// Login endpoint - POST /login
pub async fn login(
    State(state): State<AuthState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AuthApiError> {
    let Json(payload) = payload.map_err(|_| AuthApiError::MalformedBody)?;
    let username = payload.username.trim().to_string();

    info!("🔐 Login attempt: {}", username);

    let user = state
        .user_store
        .get_user_by_username(&username)
        .map_err(AuthApiError::internal)?;

    // Unknown users are checked against the decoy hash so timing matches
    let stored_hash = match &user {
        Some(user) => user.password_hash.clone(),
        None => state.user_store.decoy_hash().to_string(),
    };
    let valid = tokio::task::spawn_blocking(move || {
        password::verify_password(&stored_hash, &payload.password)
    })
    .await
    .map_err(AuthApiError::internal)?;

    let Some(user) = user else {
        warn!("❌ Failed login attempt (unknown user): {}", username);
        return Err(AuthApiError::InvalidCredentials);
    };

    if !valid {
        warn!("❌ Failed login attempt: {}", user.username);
        return Err(AuthApiError::InvalidCredentials);
    }

    if !user.is_active {
        warn!("❌ Login refused for inactive account: {}", user.username);
        return Err(AuthApiError::InvalidCredentials);
    }

    let (token, expires_in) = state
        .jwt_handler
        .generate_token(&user)
        .map_err(AuthApiError::internal)?;

    info!(
        "✅ Login successful: {} ({})",
        user.username,
        user.role.as_str()
    );

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer",
        expires_in,
        user: UserResponse::from_user(&user),
    }))
}

/// Get current session - GET /api/v1/me
/// Built from the JWT claims (no database lookup needed)
pub async fn get_current_user(claims: Claims) -> Json<SessionResponse> {
    Json(SessionResponse::from(&claims))
}

/// Update user - POST /api/v1/updateUser/:id (self or admin)
pub async fn update_user(
    State(state): State<AuthState>,
    claims: Claims,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, AuthApiError> {
    let Path(target_id) = path.map_err(|_| AuthApiError::InvalidUserId)?;
    let Json(mut update) = payload.map_err(|_| AuthApiError::MalformedBody)?;
    normalize_update(&mut update);

    let target = state
        .user_store
        .get_user_by_id(target_id)
        .map_err(AuthApiError::internal)?
        .ok_or(AuthApiError::UserNotFound)?;

    if !may_act(&claims, target.id) {
        warn!(
            actor = %claims.sub,
            target = target.id,
            "Cross-user update refused"
        );
        return Err(AuthApiError::Forbidden);
    }

    if update.changes_privileges() && !claims.is_admin() {
        warn!(actor = %claims.sub, "Non-admin attempted to change role or status");
        return Err(AuthApiError::Forbidden);
    }

    if let Some(username) = &update.username {
        if username.is_empty() {
            return Err(AuthApiError::InvalidField("Username cannot be empty"));
        }
    }
    if let Some(email) = &update.email {
        if !email.contains('@') {
            return Err(AuthApiError::InvalidField("A valid email is required"));
        }
    }

    let user = state
        .user_store
        .update_user(target.id, &update)
        .map_err(|e| match e {
            StoreError::Conflict => AuthApiError::UserAlreadyExists,
            StoreError::NotFound => AuthApiError::UserNotFound,
            StoreError::LastAdmin => AuthApiError::LastAdmin,
            other => AuthApiError::internal(other),
        })?;

    Ok(Json(UserResponse::from_user(&user)))
}

/// Usernames and emails are stored trimmed on every write path
fn normalize_update(update: &mut UpdateUserRequest) {
    if let Some(username) = update.username.as_mut() {
        *username = username.trim().to_string();
    }
    if let Some(email) = update.email.as_mut() {
        *email = email.trim().to_string();
    }
}

/// List users - GET /api/v1/admin/users (Admin only, paginated)
pub async fn list_users(
    State(state): State<AuthState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<Page<UserResponse>>, AuthApiError> {
    let Query(query) =
        query.map_err(|_| AuthApiError::InvalidField("Invalid paging parameters"))?;
    let (page, per_page) = state.page_limits.resolve(&query);
    let offset = u64::from(page - 1) * u64::from(per_page);

    let (users, total) = state
        .user_store
        .list_users(offset, per_page)
        .map_err(AuthApiError::internal)?;

    let items: Vec<UserResponse> = users.iter().map(UserResponse::from_user).collect();

    Ok(Json(Page::new(items, page, per_page, total)))
}

/// Auth API errors
#[derive(Debug)]
pub enum AuthApiError {
    MalformedBody,
    InvalidField(&'static str),
    WeakPassword,
    InvalidUserId,
    InvalidCredentials,
    Forbidden,
    UserNotFound,
    UserAlreadyExists,
    LastAdmin,
    InternalError,
}

impl AuthApiError {
    /// Log the real cause and hand back a detail-free 500.
    fn internal(err: impl std::fmt::Display) -> Self {
        error!("Internal error in auth API: {}", err);
        AuthApiError::InternalError
    }
}

impl IntoResponse for AuthApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            AuthApiError::MalformedBody => (
                StatusCode::BAD_REQUEST,
                "malformed",
                "Request body is not valid JSON for this endpoint",
            ),
            AuthApiError::InvalidField(message) => {
                (StatusCode::BAD_REQUEST, "malformed", message)
            }
            AuthApiError::WeakPassword => (
                StatusCode::BAD_REQUEST,
                "malformed",
                "Password must be at least 8 characters",
            ),
            AuthApiError::InvalidUserId => {
                (StatusCode::BAD_REQUEST, "malformed", "Invalid user ID format")
            }
            AuthApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Invalid username or password",
            ),
            AuthApiError::Forbidden => {
                (StatusCode::FORBIDDEN, "forbidden", "Insufficient permissions")
            }
            AuthApiError::UserNotFound => (StatusCode::NOT_FOUND, "not_found", "User not found"),
            AuthApiError::UserAlreadyExists => (
                StatusCode::CONFLICT,
                "conflict",
                "Username or email already exists",
            ),
            AuthApiError::LastAdmin => (
                StatusCode::CONFLICT,
                "conflict",
                "The last active admin cannot be demoted or deactivated",
            ),
            AuthApiError::InternalError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                "Internal server error",
            ),
        };

        ErrorBody::response(status, kind, message)
    }
}
