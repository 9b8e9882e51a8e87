//! Activity, system-log, and session audit queries.
//!
//! The activity and log tables are append-only: rows are inserted by the
//! recorder and read by the admin views, never updated or deleted by normal
//! operation. Session rows are a read-only audit trail as well; token
//! verification never consults them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

/// Activity row joined with the acting user's identity.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ActivityRow {
    pub id: i64,
    pub user_id: i64,
    pub action: String,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SystemLogRow {
    pub id: i64,
    pub level: String,
    pub message: String,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Session row joined with the user. The stored token is deliberately not
/// part of this view.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SessionRow {
    pub id: i64,
    pub user_id: i64,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub username: String,
    pub email: String,
}

pub async fn insert_activity(
    pool: &SqlitePool,
    user_id: i64,
    action: &str,
    details: Option<&str>,
    ip_address: Option<&str>,
    user_agent: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO user_activity (user_id, action, details, ip_address, user_agent, \
         created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(action)
    .bind(details)
    .bind(ip_address)
    .bind(user_agent)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn insert_system_log(
    pool: &SqlitePool,
    level: &str,
    message: &str,
    details: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO system_logs (level, message, details, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(level)
    .bind(message)
    .bind(details)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn insert_session(
    pool: &SqlitePool,
    user_id: i64,
    token: &str,
    ip_address: Option<&str>,
    user_agent: Option<&str>,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO user_sessions (user_id, token, ip_address, user_agent, expires_at, \
         created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(token)
    .bind(ip_address)
    .bind(user_agent)
    .bind(expires_at)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

/// Recent activity joined with user identity, newest first, optionally
/// restricted to one user. Rows for deleted users drop out of the join.
pub async fn recent_activities(
    pool: &SqlitePool,
    user_id: Option<i64>,
    limit: i64,
) -> Result<Vec<ActivityRow>, sqlx::Error> {
    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT ua.id, ua.user_id, ua.action, ua.details, ua.ip_address, ua.user_agent, \
         ua.created_at, u.username, u.email \
         FROM user_activity ua JOIN users u ON ua.user_id = u.id",
    );
    if let Some(id) = user_id {
        query.push(" WHERE ua.user_id = ").push_bind(id);
    }
    query.push(" ORDER BY ua.created_at DESC LIMIT ").push_bind(limit);

    query.build_query_as::<ActivityRow>().fetch_all(pool).await
}

pub async fn system_logs(
    pool: &SqlitePool,
    level: Option<&str>,
    limit: i64,
) -> Result<Vec<SystemLogRow>, sqlx::Error> {
    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT id, level, message, details, created_at FROM system_logs",
    );
    if let Some(level) = level {
        query.push(" WHERE level = ").push_bind(level);
    }
    query.push(" ORDER BY created_at DESC LIMIT ").push_bind(limit);

    query.build_query_as::<SystemLogRow>().fetch_all(pool).await
}

/// Sessions that have not yet expired, joined with user identity, newest
/// first. `limit` of `None` returns them all.
pub async fn active_sessions(
    pool: &SqlitePool,
    now: DateTime<Utc>,
    limit: Option<i64>,
) -> Result<Vec<SessionRow>, sqlx::Error> {
    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT us.id, us.user_id, us.ip_address, us.user_agent, us.expires_at, \
         us.created_at, u.username, u.email \
         FROM user_sessions us JOIN users u ON us.user_id = u.id \
         WHERE us.expires_at > ",
    );
    query.push_bind(now);
    query.push(" ORDER BY us.created_at DESC");
    if let Some(limit) = limit {
        query.push(" LIMIT ").push_bind(limit);
    }

    query.build_query_as::<SessionRow>().fetch_all(pool).await
}

pub async fn count_activities(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM user_activity")
        .fetch_one(pool)
        .await
}
