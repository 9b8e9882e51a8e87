//! Activity/Log Recorder
//!
//! Fire-and-forget audit trail backed by the database. Every method spawns
//! a detached task and returns immediately: recording must never fail or
//! delay the request that triggered it. Insert errors are swallowed into
//! the process log and are invisible to API callers.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::warn;

use crate::audit::RequestMeta;
use crate::db;

/// Handle for recording activity, system-log, and session rows.
#[derive(Clone)]
pub struct Recorder {
    pool: SqlitePool,
}

impl Recorder {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a user action with its request context.
    pub fn activity(
        &self,
        user_id: i64,
        action: &str,
        details: impl Into<String>,
        meta: &RequestMeta,
    ) {
        let pool = self.pool.clone();
        let action = action.to_string();
        let details = details.into();
        let ip = meta.ip.clone();
        let user_agent = meta.user_agent.clone();

        tokio::spawn(async move {
            if let Err(err) = db::activity::insert_activity(
                &pool,
                user_id,
                &action,
                Some(&details),
                Some(&ip),
                user_agent.as_deref(),
                Utc::now(),
            )
            .await
            {
                warn!(error = %err, action = %action, "Failed to record user activity");
            }
        });
    }

    /// Record a system event (WARNING, ERROR, ...).
    pub fn system(&self, level: &str, message: impl Into<String>, details: Option<String>) {
        let pool = self.pool.clone();
        let level = level.to_string();
        let message = message.into();

        tokio::spawn(async move {
            if let Err(err) =
                db::activity::insert_system_log(&pool, &level, &message, details.as_deref(), Utc::now())
                    .await
            {
                warn!(error = %err, level = %level, "Failed to record system log");
            }
        });
    }

    /// Record a login session for the admin audit views. The row is never
    /// consulted during token verification.
    pub fn session(
        &self,
        user_id: i64,
        token: &str,
        meta: &RequestMeta,
        expires_at: DateTime<Utc>,
    ) {
        let pool = self.pool.clone();
        let token = token.to_string();
        let ip = meta.ip.clone();
        let user_agent = meta.user_agent.clone();

        tokio::spawn(async move {
            if let Err(err) = db::activity::insert_session(
                &pool,
                user_id,
                &token,
                Some(&ip),
                user_agent.as_deref(),
                expires_at,
                Utc::now(),
            )
            .await
            {
                warn!(error = %err, "Failed to record user session");
            }
        });
    }
}
