//! Service layer application for the router.
//!
//! Provides the `ServiceLayers` trait that wraps the assembled router with
//! the outer HTTP concerns: request tracing, audit logging, CORS, body
//! size limits, and timeouts.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::middleware;
use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::audit::audit_middleware;
use crate::config::AppConfig;

/// Extension trait for applying the outer service layers in one place.
///
/// ```ignore
/// let app = build_router(state).with_service_layers(&config);
/// ```
pub trait ServiceLayers {
    /// Apply all layers. Order matters: the timeout and body limit sit
    /// innermost, tracing outermost so every request is logged even when
    /// an inner layer rejects it.
    fn with_service_layers(self, config: &AppConfig) -> Self;
}

impl<S> ServiceLayers for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_service_layers(self, config: &AppConfig) -> Self {
        self
            // Hanging requests are cut off rather than holding a pool slot
            .layer(TimeoutLayer::new(config.request_timeout))
            // One limit for both plain bodies and multipart uploads
            .layer(RequestBodyLimitLayer::new(config.max_request_size))
            .layer(DefaultBodyLimit::max(config.max_request_size))
            .layer(build_cors_layer())
            .layer(middleware::from_fn(audit_middleware))
            .layer(TraceLayer::new_for_http())
    }
}

/// Permissive CORS: any origin, the verbs the API uses, no credentials.
fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600))
}
