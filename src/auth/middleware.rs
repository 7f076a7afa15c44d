//! Authentication Middleware
//! Mission: Protect API endpoints with JWT validation and role gates

use crate::auth::{
    jwt::JwtHandler,
    models::{Claims, ErrorBody, UserRole},
};
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;

/// Authentication gate: requires a valid bearer token and stores its claims
/// in the request extensions for everything downstream.
pub async fn auth_middleware(
    State(jwt_handler): State<Arc<JwtHandler>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = extract_bearer(req.headers())?;

    let claims = jwt_handler.validate_token(token).map_err(|e| {
        debug!(reason = %e, path = %req.uri().path(), "Rejected bearer token");
        AuthError::InvalidToken
    })?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Authorization gate: the state is the role the route requires.
///
/// Must sit inside [`auth_middleware`]. Without claims it rejects as
/// unauthenticated instead of letting the request through.
pub async fn require_role(
    State(required): State<UserRole>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let claims = extract_claims(&req).ok_or(AuthError::MissingToken)?;

    if claims.role() != Some(required) {
        debug!(
            user = %claims.username,
            required = required.as_str(),
            "Role check failed"
        );
        return Err(AuthError::Forbidden);
    }

    Ok(next.run(req).await)
}

/// Extract claims from request (use after auth middleware)
pub fn extract_claims(req: &Request) -> Option<&Claims> {
    req.extensions().get::<Claims>()
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat)?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidFormat)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }

    Ok(token)
}

/// Handlers behind the gate take `Claims` as an argument.
#[async_trait]
impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}

/// Auth error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    MissingToken,
    InvalidFormat,
    InvalidToken,
    Forbidden,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            AuthError::MissingToken => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Missing authorization token",
            ),
            AuthError::InvalidFormat => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Invalid authorization format. Use: Bearer {token}",
            ),
            AuthError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Invalid or expired token",
            ),
            AuthError::Forbidden => (
                StatusCode::FORBIDDEN,
                "forbidden",
                "Insufficient permissions",
            ),
        };

        ErrorBody::response(status, kind, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::User;
    use axum::{body::Body, http::Request as HttpRequest, middleware, routing::get, Router};
    use tower::ServiceExt;

    const SECRET: &str = "middleware-test-secret";

    fn create_test_user(role: UserRole) -> User {
        User {
            id: 3,
            username: "testuser".to_string(),
            email: "testuser@example.com".to_string(),
            password_hash: "hash".to_string(),
            role,
            is_active: true,
            created_at: chrono::Utc::now().to_rfc3339(),
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    async fn whoami(claims: Claims) -> String {
        claims.username
    }

    fn gated_router(jwt: Arc<JwtHandler>) -> Router {
        let admin = Router::new()
            .route("/admin", get(whoami))
            .route_layer(middleware::from_fn_with_state(UserRole::Admin, require_role));

        Router::new()
            .route("/me", get(whoami))
            .merge(admin)
            .route_layer(middleware::from_fn_with_state(jwt, auth_middleware))
    }

    async fn status_of(router: Router, path: &str, auth: Option<&str>) -> StatusCode {
        let mut builder = HttpRequest::builder().uri(path);
        if let Some(value) = auth {
            builder = builder.header(AUTHORIZATION, value);
        }
        router
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[test]
    fn test_auth_error_responses() {
        let missing = AuthError::MissingToken.into_response();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let invalid_format = AuthError::InvalidFormat.into_response();
        assert_eq!(invalid_format.status(), StatusCode::UNAUTHORIZED);

        let invalid_token = AuthError::InvalidToken.into_response();
        assert_eq!(invalid_token.status(), StatusCode::UNAUTHORIZED);

        let forbidden = AuthError::Forbidden.into_response();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_extract_claims_from_request() {
        let mut req = HttpRequest::new(Body::empty());

        assert!(extract_claims(&req).is_none());

        let claims = Claims {
            sub: "3".to_string(),
            username: "test".to_string(),
            role: "user".to_string(),
            iat: 1234567000,
            exp: 1234567890,
        };
        req.extensions_mut().insert(claims);

        let extracted = extract_claims(&req);
        assert_eq!(extracted.map(|c| c.username.as_str()), Some("test"));
    }

    #[test]
    fn test_extract_bearer() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer(&headers), Err(AuthError::MissingToken));

        headers.insert(AUTHORIZATION, "Basic dXNlcjpwYXNz".parse().unwrap());
        assert_eq!(extract_bearer(&headers), Err(AuthError::InvalidFormat));

        headers.insert(AUTHORIZATION, "bearer abc".parse().unwrap());
        assert_eq!(extract_bearer(&headers), Err(AuthError::InvalidFormat));

        headers.insert(AUTHORIZATION, "Bearer    ".parse().unwrap());
        assert_eq!(extract_bearer(&headers), Err(AuthError::MissingToken));

        headers.insert(AUTHORIZATION, "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(extract_bearer(&headers), Ok("abc.def.ghi"));
    }

    #[tokio::test]
    async fn test_gate_rejects_missing_and_bad_tokens() {
        let jwt = Arc::new(JwtHandler::new(SECRET.to_string()));
        let other = JwtHandler::new("some-other-secret".to_string());
        let (foreign, _) = other
            .generate_token(&create_test_user(UserRole::Admin))
            .unwrap();

        let router = gated_router(jwt);
        assert_eq!(
            status_of(router.clone(), "/me", None).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(router.clone(), "/me", Some("Bearer invalid.token.here")).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(router, "/me", Some(&format!("Bearer {foreign}"))).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_gate_passes_claims_through() {
        let jwt = Arc::new(JwtHandler::new(SECRET.to_string()));
        let (token, _) = jwt.generate_token(&create_test_user(UserRole::User)).unwrap();

        let response = gated_router(jwt)
            .oneshot(
                HttpRequest::builder()
                    .uri("/me")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"testuser");
    }

    #[tokio::test]
    async fn test_role_gate() {
        let jwt = Arc::new(JwtHandler::new(SECRET.to_string()));
        let (user_token, _) = jwt.generate_token(&create_test_user(UserRole::User)).unwrap();
        let (admin_token, _) = jwt
            .generate_token(&create_test_user(UserRole::Admin))
            .unwrap();

        let router = gated_router(jwt);
        assert_eq!(
            status_of(router.clone(), "/admin", Some(&format!("Bearer {user_token}"))).await,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(router.clone(), "/admin", Some(&format!("Bearer {admin_token}"))).await,
            StatusCode::OK
        );
        assert_eq!(
            status_of(router, "/admin", None).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_role_gate_without_auth_gate_fails_closed() {
        let router = Router::new()
            .route("/admin", get(|| async { "should not reach" }))
            .route_layer(middleware::from_fn_with_state(UserRole::Admin, require_role));

        assert_eq!(
            status_of(router, "/admin", Some("Bearer whatever")).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_unknown_role_tag_is_forbidden() {
        let jwt = Arc::new(JwtHandler::new(SECRET.to_string()));
        let claims = Claims {
            sub: "3".to_string(),
            username: "mallory".to_string(),
            role: "Admin".to_string(),
            iat: chrono::Utc::now().timestamp() as usize,
            exp: chrono::Utc::now().timestamp() as usize + 600,
        };
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(
            status_of(gated_router(jwt), "/admin", Some(&format!("Bearer {token}"))).await,
            StatusCode::FORBIDDEN
        );
    }
}
