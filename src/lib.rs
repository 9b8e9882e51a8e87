//! # studyhall
//!
//! Education-platform backend: signup/login with JWT session tokens,
//! admin-managed course content with file uploads, per-chapter progress
//! tracking, and a database-backed activity/system audit trail, all over a
//! single SQLite store.
//!
//! ## Architecture
//!
//! A request hits the access middleware (where the route requires it),
//! which verifies the bearer token and attaches the decoded claims to the
//! request; the handler then talks to the store through a request-scoped
//! pool reference and may hand audit rows to the fire-and-forget recorder.
//!
//! - **auth**: password hashing (argon2), token issue/verify
//!   (jsonwebtoken), and the user/admin access policies
//! - **content**: public listing, admin CRUD, multipart uploads
//! - **progress**: last-write-wins per-chapter progress
//! - **admin**: aggregate views and user control actions
//! - **recorder**: best-effort activity/system/session logging
//!
//! Sessions are stateless: validity is signature + expiry, nothing else.
//! The premium flag on content is advisory metadata, not an enforced gate
//! (see DESIGN.md for the full list of preserved weaknesses).

pub mod admin;
pub mod audit;
pub mod auth;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod events;
pub mod layers;
pub mod progress;
pub mod recorder;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower_http::services::ServeDir;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::layers::ServiceLayers;
use crate::recorder::Recorder;

/// Application state shared across handlers.
///
/// Constructed once at startup and cloned per request; handlers never reach
/// for ambient globals.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pool: SqlitePool,
    pub recorder: Recorder,
}

impl AppState {
    pub fn new(config: AppConfig, pool: SqlitePool) -> Self {
        Self {
            config: Arc::new(config),
            recorder: Recorder::new(pool.clone()),
            pool,
        }
    }
}

/// Assemble the full router, service layers included.
pub fn build_router(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    // Open routes: health, credential exchange, public content
    let public_routes = Router::new()
        .route("/api/health", get(health))
        .route("/api/signup", post(auth::handlers::signup))
        .route("/api/login", post(auth::handlers::login))
        .route("/api/admin/login", post(auth::handlers::admin_login))
        .route("/api/content", get(content::handlers::list_public));

    // Routes behind the user policy
    let user_routes = Router::new()
        .route("/api/profile", get(auth::handlers::profile))
        .route("/api/premium-content", get(content::handlers::premium_content))
        .route(
            "/api/progress",
            post(progress::handlers::save_progress).get(progress::handlers::list_progress),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_user,
        ));

    // Routes behind the admin policy
    let admin_routes = Router::new()
        .route(
            "/api/admin/content",
            get(content::handlers::list_admin).post(content::handlers::create_content),
        )
        .route("/api/admin/content/{id}", delete(content::handlers::delete_content))
        .route("/api/admin/users", get(admin::handlers::list_users))
        .route("/api/admin/stats", get(admin::handlers::stats))
        .route("/api/admin/dashboard", get(admin::handlers::dashboard))
        .route("/api/admin/activities", get(admin::handlers::activities))
        .route("/api/admin/logs", get(admin::handlers::logs))
        .route("/api/admin/sessions", get(admin::handlers::sessions))
        .route("/api/admin/users/{id}/control", post(admin::handlers::control_user))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_admin,
        ));

    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir))
        .fallback(route_not_found)
        .with_state(state)
        .with_service_layers(&config)
}

/// Liveness check including a store round-trip.
async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<Json<Value>, AppError> {
    db::health_check(&state.pool)
        .await
        .map_err(|e| AppError::internal(format!("Health check failed: {}", e)))?;

    Ok(Json(json!({
        "status": "OK",
        "message": "studyhall backend is running",
    })))
}

/// Fallback for unmatched routes.
async fn route_not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Route not found" })),
    )
}
