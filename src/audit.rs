//! HTTP Audit Middleware
//!
//! Request-level audit logging: every request runs inside a span carrying
//! method, path, client IP, and a correlation id, and security-relevant
//! outcomes (401, 403, 5xx) are emitted as structured security events.
//! This is process-log auditing; the database-backed activity trail lives
//! in [`crate::recorder`].

use axum::{
    extract::Request,
    http::{request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{error, info};

use crate::events::SecurityEvent;
use crate::security_event;

/// Client-supplied request context recorded alongside activity rows.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    /// Best-effort client IP; "unknown" when no proxy header is present
    pub ip: String,
    /// User-Agent header, if any
    pub user_agent: Option<String>,
}

impl RequestMeta {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            ip: extract_client_ip(headers),
            user_agent: headers
                .get("user-agent")
                .and_then(|v| v.to_str().ok())
                .map(String::from),
        }
    }
}

impl<S> axum::extract::FromRequestParts<S> for RequestMeta
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestMeta::from_headers(&parts.headers))
    }
}

/// Audit middleware; apply with `axum::middleware::from_fn`.
pub async fn audit_middleware(request: Request, next: Next) -> Response {
    let correlation_id = extract_or_generate_correlation_id(&request);
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client_ip = extract_client_ip(request.headers());

    let start = Instant::now();

    let span = tracing::info_span!(
        "http_request",
        correlation_id = %correlation_id,
        method = %method,
        path = %path,
        client_ip = %client_ip,
    );
    let _guard = span.enter();

    let response = next.run(request).await;

    let status = response.status();
    let latency = start.elapsed();

    log_security_event(status, &path, &client_ip);

    info!(
        status = %status.as_u16(),
        latency_ms = %latency.as_millis(),
        "Request completed"
    );

    response
}

/// Emit security events for auth-relevant response statuses.
fn log_security_event(status: StatusCode, path: &str, client_ip: &str) {
    match status {
        StatusCode::UNAUTHORIZED => {
            security_event!(
                SecurityEvent::AuthenticationFailure,
                ip_address = %client_ip,
                path = %path,
                "Authentication failure"
            );
        }
        StatusCode::FORBIDDEN => {
            security_event!(
                SecurityEvent::AccessDenied,
                ip_address = %client_ip,
                path = %path,
                "Access denied"
            );
        }
        status if status.is_server_error() => {
            error!(
                status = %status.as_u16(),
                ip_address = %client_ip,
                path = %path,
                "Server error occurred"
            );
        }
        _ => {}
    }
}

fn extract_or_generate_correlation_id(request: &Request) -> String {
    request
        .headers()
        .get("x-correlation-id")
        .or_else(|| request.headers().get("x-request-id"))
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .unwrap_or_else(generate_request_id)
}

/// Generate a simple request ID without external dependencies
fn generate_request_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("req-{:x}", timestamp)
}

/// Extract client IP from proxy headers.
///
/// Checks, in order: `X-Forwarded-For` (first entry of the chain),
/// `X-Real-IP`, `CF-Connecting-IP`. Returns "unknown" when none match.
pub fn extract_client_ip(headers: &HeaderMap) -> String {
    if let Some(xff) = headers.get("x-forwarded-for") {
        if let Ok(xff_str) = xff.to_str() {
            if let Some(first_ip) = xff_str.split(',').next() {
                return first_ip.trim().to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip) = real_ip.to_str() {
            return ip.to_string();
        }
    }

    if let Some(cf_ip) = headers.get("cf-connecting-ip") {
        if let Ok(ip) = cf_ip.to_str() {
            return ip.to_string();
        }
    }

    "unknown".to_string()
}
