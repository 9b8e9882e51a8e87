//! Per-user chapter progress queries.
//!
//! At most one row exists per (user, chapter); a repeated submission
//! overwrites the previous value. The unique constraint is the arbiter:
//! the upsert relies on `ON CONFLICT` rather than a read-then-write.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProgressRow {
    pub id: i64,
    pub user_id: i64,
    pub chapter_id: i64,
    pub progress: i64,
    pub updated_at: DateTime<Utc>,
}

/// Per-user aggregate used by the admin dashboard.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProgressSummaryRow {
    pub username: String,
    pub progress_count: i64,
    pub avg_progress: Option<f64>,
}

/// Insert or replace the progress value for (user, chapter). Last write
/// wins; there is no merge or aggregation.
pub async fn upsert(
    pool: &SqlitePool,
    user_id: i64,
    chapter_id: i64,
    progress: i64,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO user_progress (user_id, chapter_id, progress, updated_at) \
         VALUES (?, ?, ?, ?) \
         ON CONFLICT (user_id, chapter_id) \
         DO UPDATE SET progress = excluded.progress, updated_at = excluded.updated_at",
    )
    .bind(user_id)
    .bind(chapter_id)
    .bind(progress)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_for_user(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Vec<ProgressRow>, sqlx::Error> {
    sqlx::query_as::<_, ProgressRow>(
        "SELECT id, user_id, chapter_id, progress, updated_at \
         FROM user_progress WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM user_progress")
        .fetch_one(pool)
        .await
}

/// Average progress across all rows; `None` when the table is empty.
pub async fn average(pool: &SqlitePool) -> Result<Option<f64>, sqlx::Error> {
    sqlx::query_scalar("SELECT AVG(progress) FROM user_progress")
        .fetch_one(pool)
        .await
}

/// Per-user progress summary (row count + average), including users with
/// no progress at all.
pub async fn summary(pool: &SqlitePool) -> Result<Vec<ProgressSummaryRow>, sqlx::Error> {
    sqlx::query_as::<_, ProgressSummaryRow>(
        "SELECT u.username, COUNT(up.id) AS progress_count, AVG(up.progress) AS avg_progress \
         FROM users u LEFT JOIN user_progress up ON u.id = up.user_id \
         GROUP BY u.id",
    )
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, users, DatabaseConfig};

    #[tokio::test]
    async fn test_upsert_overwrites_not_duplicates() {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        let user = users::insert(&pool, "alice", "a@x.com", "digest", Utc::now())
            .await
            .unwrap();

        upsert(&pool, user, 3, 40, Utc::now()).await.unwrap();
        upsert(&pool, user, 3, 85, Utc::now()).await.unwrap();

        let rows = list_for_user(&pool, user).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].chapter_id, 3);
        assert_eq!(rows[0].progress, 85);
    }

    #[tokio::test]
    async fn test_distinct_chapters_keep_distinct_rows() {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        let user = users::insert(&pool, "alice", "a@x.com", "digest", Utc::now())
            .await
            .unwrap();

        upsert(&pool, user, 1, 10, Utc::now()).await.unwrap();
        upsert(&pool, user, 2, 20, Utc::now()).await.unwrap();

        assert_eq!(list_for_user(&pool, user).await.unwrap().len(), 2);
        assert_eq!(count(&pool).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_average_empty_is_none() {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        assert_eq!(average(&pool).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_summary_includes_users_without_progress() {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        users::insert(&pool, "idle", "i@x.com", "digest", Utc::now())
            .await
            .unwrap();

        let rows = summary(&pool).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].progress_count, 0);
        assert_eq!(rows[0].avg_progress, None);
    }
}
