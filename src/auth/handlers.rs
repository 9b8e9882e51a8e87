//! Authentication Handlers
//!
//! Signup, login, admin login, and the profile echo. Failed logins leave a
//! WARNING row in the system log and successful ones leave an activity row
//! and a session row, all fire-and-forget. The credential-compare path
//! answers "Invalid credentials" for both unknown emails and bad passwords.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use super::jwt::{self, Claims, ROLE_ADMIN};
use super::password::{hash_password, verify_password};
use crate::audit::RequestMeta;
use crate::db;
use crate::error::AppError;
use crate::events::SecurityEvent;
use crate::security_event;
use crate::AppState;

#[derive(Deserialize)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Missing and empty are the same thing to the validation rules.
fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Create a user account and issue a session token.
pub async fn signup(
    State(state): State<AppState>,
    Json(input): Json<SignupRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let (username, email, password) = match (
        required(&input.username),
        required(&input.email),
        required(&input.password),
    ) {
        (Some(u), Some(e), Some(p)) => (u, e, p),
        _ => return Err(AppError::validation("All fields are required")),
    };

    if db::users::exists(&state.pool, email, username)
        .await
        .map_err(|e| AppError::store("Database error", e))?
    {
        return Err(AppError::validation("User already exists"));
    }

    let password_hash = hash_password(password)?;

    // The unique constraints are the real arbiter; a concurrent signup that
    // slipped past the pre-check surfaces here as a violation.
    let user_id = match db::users::insert(&state.pool, username, email, &password_hash, Utc::now())
        .await
    {
        Ok(id) => id,
        Err(err)
            if err
                .as_database_error()
                .map(|e| e.is_unique_violation())
                .unwrap_or(false) =>
        {
            return Err(AppError::validation("User already exists"));
        }
        Err(err) => return Err(AppError::store("Failed to create user", err)),
    };

    let token = jwt::issue_token(
        user_id,
        username,
        email,
        None,
        &state.config.jwt_secret,
        state.config.token_ttl,
    )?;

    security_event!(
        SecurityEvent::UserRegistered,
        user_id = %user_id,
        username = %username,
        "New user registered"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User created successfully",
            "token": token,
            "user": { "id": user_id, "username": username, "email": email },
        })),
    ))
}

/// Verify credentials and issue a session token.
pub async fn login(
    State(state): State<AppState>,
    meta: RequestMeta,
    Json(input): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let (email, password) = match (required(&input.email), required(&input.password)) {
        (Some(e), Some(p)) => (e, p),
        _ => return Err(AppError::validation("Email and password are required")),
    };

    let user = db::users::find_by_email(&state.pool, email)
        .await
        .map_err(|e| AppError::store("Database error", e))?;

    let Some(user) = user else {
        state.recorder.system(
            "WARNING",
            format!("Failed login attempt for email: {}", email),
            Some(format!("IP: {}", meta.ip)),
        );
        return Err(AppError::auth_failed("Invalid credentials"));
    };

    if !verify_password(password, &user.password) {
        state.recorder.system(
            "WARNING",
            format!("Failed login attempt for user: {}", user.username),
            Some(format!("IP: {}", meta.ip)),
        );
        return Err(AppError::auth_failed("Invalid credentials"));
    }

    let token = jwt::issue_token(
        user.id,
        &user.username,
        &user.email,
        None,
        &state.config.jwt_secret,
        state.config.token_ttl,
    )?;

    let expires_at = Utc::now()
        + Duration::from_std(state.config.token_ttl).unwrap_or_else(|_| Duration::hours(24));
    state.recorder.activity(
        user.id,
        "LOGIN",
        format!("User logged in from IP: {}", meta.ip),
        &meta,
    );
    state.recorder.session(user.id, &token, &meta, expires_at);

    security_event!(
        SecurityEvent::AuthenticationSuccess,
        user_id = %user.id,
        email = %user.email,
        ip_address = %meta.ip,
        "User authenticated"
    );

    Ok(Json(json!({
        "message": "Login successful",
        "token": token,
        "user": { "id": user.id, "username": user.username, "email": user.email },
    })))
}

/// Verify admin credentials and issue an admin session token.
///
/// Checked against `admin_users` only; the seeded account created at
/// startup is an ordinary row here, not a code path.
pub async fn admin_login(
    State(state): State<AppState>,
    meta: RequestMeta,
    Json(input): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let (email, password) = match (required(&input.email), required(&input.password)) {
        (Some(e), Some(p)) => (e, p),
        _ => return Err(AppError::validation("Email and password are required")),
    };

    let admin = db::users::find_admin_by_email(&state.pool, email)
        .await
        .map_err(|e| AppError::store("Database error", e))?;

    let Some(admin) = admin else {
        security_event!(
            SecurityEvent::AuthenticationFailure,
            email = %email,
            ip_address = %meta.ip,
            "Admin login failed"
        );
        return Err(AppError::auth_failed("Invalid admin credentials"));
    };

    if !verify_password(password, &admin.password) {
        security_event!(
            SecurityEvent::AuthenticationFailure,
            email = %email,
            ip_address = %meta.ip,
            "Admin login failed"
        );
        return Err(AppError::auth_failed("Invalid admin credentials"));
    }

    let token = jwt::issue_token(
        admin.id,
        &admin.username,
        &admin.email,
        Some(ROLE_ADMIN),
        &state.config.jwt_secret,
        state.config.token_ttl,
    )?;

    security_event!(
        SecurityEvent::AuthenticationSuccess,
        user_id = %admin.id,
        email = %admin.email,
        ip_address = %meta.ip,
        "Admin authenticated"
    );

    Ok(Json(json!({
        "message": "Admin login successful",
        "token": token,
        "admin": {
            "id": admin.id,
            "username": admin.username,
            "email": admin.email,
            "role": admin.role,
        },
    })))
}

/// Echo the caller's identity claims.
pub async fn profile(claims: Claims) -> Json<Value> {
    Json(json!({ "user": claims }))
}
