//! Access Middleware
//!
//! Two stateless per-request policies gate the protected routes:
//!
//! - user policy: a valid bearer token is enough;
//! - admin policy: the same verification plus a `role == "admin"` claim.
//!
//! On success the decoded [`Claims`] are attached to the request
//! extensions, where handlers pick them up through the `FromRequestParts`
//! extractor below.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use super::jwt::{self, Claims};
use crate::error::AppError;
use crate::AppState;

/// Pull the token out of an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Require a valid session token.
pub async fn require_user(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| AppError::auth_failed("Access token required"))?;

    let claims = jwt::verify_token(token, &state.config.jwt_secret)?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Require a valid session token whose role claim is `admin`.
///
/// A well-formed, unexpired token without the admin role is an
/// authorization failure (403), not an authentication one.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| AppError::auth_failed("Admin token required"))?;

    let claims = jwt::verify_token(token, &state.config.jwt_secret)?;

    if !claims.is_admin() {
        return Err(AppError::forbidden("Insufficient admin privileges"));
    }

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Extract claims attached by the middleware.
///
/// ```ignore
/// async fn handler(claims: Claims) -> impl IntoResponse {
///     format!("Hello, user {}", claims.sub)
/// }
/// ```
impl<S> axum::extract::FromRequestParts<S> for Claims
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .ok_or_else(|| AppError::auth_failed("Not authenticated"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn test_missing_or_malformed_header() {
        let headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(bearer_token(&headers), None);
    }
}
