//! Content item queries.
//!
//! The premium flag is stored and returned but is not an access gate: the
//! public listing returns premium rows to anonymous callers. That boundary
//! is intentional (see DESIGN.md); real premium gating happens outside
//! this service.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

/// Full content row, as returned to admin callers.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ContentItem {
    pub id: i64,
    pub title: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub content_type: String,
    pub content: Option<String>,
    pub file_url: Option<String>,
    pub chapter_id: Option<i64>,
    pub is_premium: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public listing view: the columns the public API exposes.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PublicContentItem {
    pub id: i64,
    pub title: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub content_type: String,
    pub content: Option<String>,
    pub file_url: Option<String>,
    pub chapter_id: Option<i64>,
    pub is_premium: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields for a new content row.
#[derive(Debug, Clone)]
pub struct NewContent {
    pub title: String,
    pub content_type: String,
    pub content: Option<String>,
    pub file_url: Option<String>,
    pub chapter_id: Option<i64>,
    pub is_premium: bool,
}

pub async fn insert(
    pool: &SqlitePool,
    item: &NewContent,
    now: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO content (title, type, content, file_url, chapter_id, is_premium, \
         created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&item.title)
    .bind(&item.content_type)
    .bind(&item.content)
    .bind(&item.file_url)
    .bind(item.chapter_id)
    .bind(item.is_premium)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Admin listing: all columns, optionally filtered by type, newest first.
pub async fn list_admin(
    pool: &SqlitePool,
    content_type: Option<&str>,
) -> Result<Vec<ContentItem>, sqlx::Error> {
    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT id, title, type, content, file_url, chapter_id, is_premium, \
         created_at, updated_at FROM content WHERE 1=1",
    );
    if let Some(t) = content_type {
        query.push(" AND type = ").push_bind(t);
    }
    query.push(" ORDER BY created_at DESC");

    query.build_query_as::<ContentItem>().fetch_all(pool).await
}

/// Public listing: filterable by type and chapter, newest first. No
/// premium filtering; see module docs.
pub async fn list_public(
    pool: &SqlitePool,
    content_type: Option<&str>,
    chapter_id: Option<i64>,
) -> Result<Vec<PublicContentItem>, sqlx::Error> {
    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT id, title, type, content, file_url, chapter_id, is_premium, \
         created_at FROM content WHERE 1=1",
    );
    if let Some(t) = content_type {
        query.push(" AND type = ").push_bind(t);
    }
    if let Some(c) = chapter_id {
        query.push(" AND chapter_id = ").push_bind(c);
    }
    query.push(" ORDER BY created_at DESC");

    query
        .build_query_as::<PublicContentItem>()
        .fetch_all(pool)
        .await
}

/// Look up the stored file URL for a row, if the row exists.
pub async fn file_url(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<Option<String>>, sqlx::Error> {
    sqlx::query_scalar::<_, Option<String>>("SELECT file_url FROM content WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM content WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM content")
        .fetch_one(pool)
        .await
}
