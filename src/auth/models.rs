//! Authentication Models
//! Mission: Define user identities, token claims and the request/response shapes

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// User account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash - never serialize
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// User roles for RBAC
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum UserRole {
    #[serde(rename = "user")]
    User, // Self-service access to own account
    #[serde(rename = "admin")]
    Admin, // Full access, including other users' accounts
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }

    /// Exact, case-sensitive match against the closed role set.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(UserRole::User),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

/// JWT Claims payload
///
/// `role` carries the tag exactly as it was signed. Gates resolve it through
/// [`Claims::role`], so a tag outside the role set grants nothing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String, // subject (user_id)
    pub username: String,
    pub role: String,
    pub iat: usize, // issued-at timestamp
    pub exp: usize, // expiration timestamp
}

impl Claims {
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }

    pub fn role(&self) -> Option<UserRole> {
        UserRole::parse(&self.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(UserRole::Admin)
    }
}

/// Registration request body
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: usize, // seconds until expiration
    pub user: UserResponse,
}

/// Partial update of a user; absent fields are left untouched.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

impl UpdateUserRequest {
    /// Whether the update touches fields only an admin may change.
    pub fn changes_privileges(&self) -> bool {
        self.role.is_some() || self.is_active.is_some()
    }
}

/// User response (sanitized)
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl UserResponse {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at.clone(),
            updated_at: user.updated_at.clone(),
        }
    }
}

/// Current session, read straight from the verified claims
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user_id: String,
    pub username: String,
    pub role: String,
    pub issued_at: usize,
    pub expires_at: usize,
}

impl From<&Claims> for SessionResponse {
    fn from(claims: &Claims) -> Self {
        Self {
            user_id: claims.sub.clone(),
            username: claims.username.clone(),
            role: claims.role.clone(),
            issued_at: claims.iat,
            expires_at: claims.exp,
        }
    }
}

/// Query parameters for paginated listings
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// One page of a listing
#[derive(Debug, Serialize)]
pub struct Page<T: Serialize> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl<T: Serialize> Page<T> {
    pub fn new(items: Vec<T>, page: u32, per_page: u32, total: u64) -> Self {
        let per_page_u64 = u64::from(per_page.max(1));
        let total_pages = if total == 0 {
            1
        } else {
            total.div_ceil(per_page_u64)
        };

        Self {
            items,
            page,
            per_page,
            total,
            total_pages,
        }
    }
}

/// JSON error body: the taxonomy kind plus a generic message, nothing else.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl ErrorBody {
    pub fn response(status: StatusCode, kind: &str, message: &str) -> Response {
        let body = ErrorBody {
            error: kind.to_string(),
            message: message.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: 7,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "$2b$04$abcdefghijklmnopqrstuu".to_string(),
            role: UserRole::User,
            is_active: true,
            created_at: "2025-01-01T00:00:00Z".to_string(),
            updated_at: "2025-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_user_role_serialization() {
        let admin = UserRole::Admin;
        let json = serde_json::to_string(&admin).unwrap();
        assert_eq!(json, r#""admin""#);

        let user: UserRole = serde_json::from_str(r#""user""#).unwrap();
        assert_eq!(user, UserRole::User);

        assert!(serde_json::from_str::<UserRole>(r#""Admin""#).is_err());
    }

    #[test]
    fn test_user_role_parse_is_case_sensitive() {
        assert_eq!(UserRole::parse("admin"), Some(UserRole::Admin));
        assert_eq!(UserRole::parse("user"), Some(UserRole::User));
        assert_eq!(UserRole::parse("ADMIN"), None);
        assert_eq!(UserRole::parse("Admin"), None);
        assert_eq!(UserRole::parse("superuser"), None);
        assert_eq!(UserRole::parse(""), None);
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let user = sample_user();

        let raw = serde_json::to_value(&user).unwrap();
        assert!(raw.get("password_hash").is_none());

        let sanitized = serde_json::to_value(UserResponse::from_user(&user)).unwrap();
        assert!(sanitized.get("password_hash").is_none());
        assert!(sanitized.get("password").is_none());
        assert_eq!(sanitized["username"], "alice");
        assert_eq!(sanitized["role"], "user");
    }

    #[test]
    fn test_claims_accessors() {
        let claims = Claims {
            sub: "42".to_string(),
            username: "bob".to_string(),
            role: "admin".to_string(),
            iat: 1,
            exp: 2,
        };
        assert_eq!(claims.user_id(), Some(42));
        assert!(claims.is_admin());

        let odd = Claims {
            sub: "not-a-number".to_string(),
            role: "root".to_string(),
            ..claims
        };
        assert_eq!(odd.user_id(), None);
        assert_eq!(odd.role(), None);
        assert!(!odd.is_admin());
    }

    #[test]
    fn test_page_counts() {
        let page = Page::new(vec![1, 2, 3], 1, 3, 10);
        assert_eq!(page.total_pages, 4);

        let empty: Page<u8> = Page::new(Vec::new(), 1, 20, 0);
        assert_eq!(empty.total_pages, 1);
    }

    #[test]
    fn test_update_request_privilege_detection() {
        let email_only = UpdateUserRequest {
            email: Some("new@example.com".to_string()),
            ..Default::default()
        };
        assert!(!email_only.changes_privileges());

        let promote = UpdateUserRequest {
            role: Some(UserRole::Admin),
            ..Default::default()
        };
        assert!(promote.changes_privileges());

        let deactivate = UpdateUserRequest {
            is_active: Some(false),
            ..Default::default()
        };
        assert!(deactivate.changes_privileges());
    }
}
