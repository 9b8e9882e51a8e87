//! Admin Handlers
//!
//! Aggregate views over users, content, progress, and the audit tables,
//! plus the user control actions. The aggregate endpoints fan their
//! independent queries out concurrently and join before responding; no
//! sub-query depends on another's result.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::password::hash_password;
use crate::db;
use crate::error::AppError;
use crate::events::SecurityEvent;
use crate::security_event;
use crate::AppState;

/// Temporary password assigned by the reset action. Returned to the admin
/// in the response body; listed as a known weakness in DESIGN.md.
const RESET_PASSWORD: &str = "temp123";

/// List all users (digest-free view), newest first.
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let users = db::users::list(&state.pool)
        .await
        .map_err(|e| AppError::store("Failed to fetch users", e))?;

    Ok(Json(json!({ "users": users })))
}

/// Headline statistics: user count, progress rows, average progress.
pub async fn stats(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let (total_users, total_progress, average_progress) = tokio::try_join!(
        db::users::count(&state.pool),
        db::progress::count(&state.pool),
        db::progress::average(&state.pool),
    )
    .map_err(|e| AppError::store("Failed to fetch stats", e))?;

    Ok(Json(json!({
        "totalUsers": total_users,
        "totalProgress": total_progress,
        "averageProgress": average_progress.unwrap_or(0.0).round() as i64,
    })))
}

/// Full dashboard: totals, recent activity, active sessions, latest system
/// logs, and the per-user progress summary.
pub async fn dashboard(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let now = Utc::now();

    let (
        total_users,
        total_admins,
        total_content,
        total_activities,
        recent_activities,
        active_sessions,
        system_logs,
        progress_summary,
    ) = tokio::try_join!(
        db::users::count(&state.pool),
        db::users::count_admins(&state.pool),
        db::content::count(&state.pool),
        db::activity::count_activities(&state.pool),
        db::activity::recent_activities(&state.pool, None, 10),
        db::activity::active_sessions(&state.pool, now, Some(10)),
        db::activity::system_logs(&state.pool, None, 20),
        db::progress::summary(&state.pool),
    )
    .map_err(|e| AppError::store("Failed to fetch dashboard data", e))?;

    Ok(Json(json!({
        "totalUsers": total_users,
        "totalAdmins": total_admins,
        "totalContent": total_content,
        "totalActivities": total_activities,
        "recentActivities": recent_activities,
        "activeSessions": active_sessions,
        "systemLogs": system_logs,
        "userProgressSummary": progress_summary,
    })))
}

#[derive(Deserialize)]
pub struct ActivitiesQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<i64>,
    pub limit: Option<i64>,
}

/// User activity trail, optionally filtered to one user.
pub async fn activities(
    State(state): State<AppState>,
    Query(query): Query<ActivitiesQuery>,
) -> Result<Json<Value>, AppError> {
    let rows = db::activity::recent_activities(
        &state.pool,
        query.user_id,
        query.limit.unwrap_or(50),
    )
    .await
    .map_err(|e| AppError::store("Failed to fetch activities", e))?;

    Ok(Json(json!({ "activities": rows })))
}

#[derive(Deserialize)]
pub struct LogsQuery {
    pub level: Option<String>,
    pub limit: Option<i64>,
}

/// System log trail, optionally filtered by level.
pub async fn logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Value>, AppError> {
    let rows = db::activity::system_logs(
        &state.pool,
        query.level.as_deref(),
        query.limit.unwrap_or(100),
    )
    .await
    .map_err(|e| AppError::store("Failed to fetch logs", e))?;

    Ok(Json(json!({ "logs": rows })))
}

/// Sessions that have not yet expired.
pub async fn sessions(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let rows = db::activity::active_sessions(&state.pool, Utc::now(), None)
        .await
        .map_err(|e| AppError::store("Failed to fetch sessions", e))?;

    Ok(Json(json!({ "sessions": rows })))
}

#[derive(Deserialize)]
pub struct ControlRequest {
    pub action: Option<String>,
}

/// Suspend, delete, or reset the password of a user account.
pub async fn control_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(input): Json<ControlRequest>,
) -> Result<Json<Value>, AppError> {
    match input.action.as_deref() {
        Some("suspend") => {
            db::users::suspend(&state.pool, user_id)
                .await
                .map_err(|e| AppError::store("Failed to suspend user", e))?;

            security_event!(
                SecurityEvent::UserSuspended,
                user_id = %user_id,
                "User suspended by admin"
            );
            Ok(Json(json!({ "message": "User suspended successfully" })))
        }

        Some("delete") => {
            let deleted = db::users::delete(&state.pool, user_id)
                .await
                .map_err(|e| AppError::store("Failed to delete user", e))?;
            if deleted == 0 {
                return Err(AppError::not_found("User not found"));
            }

            security_event!(
                SecurityEvent::UserDeleted,
                user_id = %user_id,
                "User deleted by admin"
            );
            Ok(Json(json!({ "message": "User deleted successfully" })))
        }

        Some("reset_password") => {
            let password_hash = hash_password(RESET_PASSWORD)
                .map_err(|_| AppError::internal("Failed to reset password"))?;
            db::users::set_password(&state.pool, user_id, &password_hash)
                .await
                .map_err(|e| AppError::store("Failed to reset password", e))?;

            security_event!(
                SecurityEvent::PasswordReset,
                user_id = %user_id,
                "Password reset by admin"
            );
            Ok(Json(json!({
                "message": "Password reset successfully",
                "newPassword": RESET_PASSWORD,
            })))
        }

        _ => Err(AppError::validation("Invalid action")),
    }
}
