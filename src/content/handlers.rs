//! Content Handlers
//!
//! The public listing is filterable by type and chapter and returns premium
//! rows to any caller: the premium flag is advisory metadata here, not an
//! access gate (see DESIGN.md). Uploads land in the configured upload
//! directory under a generated name and are served statically at
//! `/uploads`.

use std::path::Path as FsPath;

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{self, content::NewContent};
use crate::error::AppError;
use crate::AppState;

#[derive(Deserialize)]
pub struct PublicContentQuery {
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    pub chapter_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct AdminContentQuery {
    #[serde(rename = "type")]
    pub content_type: Option<String>,
}

/// Public content listing, filterable by type and chapter.
pub async fn list_public(
    State(state): State<AppState>,
    Query(query): Query<PublicContentQuery>,
) -> Result<Json<Value>, AppError> {
    let rows = db::content::list_public(
        &state.pool,
        query.content_type.as_deref(),
        query.chapter_id,
    )
    .await
    .map_err(|e| AppError::store("Failed to fetch content", e))?;

    Ok(Json(json!({ "content": rows })))
}

/// Static sample payload behind the generic user gate.
pub async fn premium_content() -> Json<Value> {
    Json(json!({
        "message": "Premium content access granted",
        "content": [
            { "type": "video", "title": "Advanced Problem Solving", "duration": "45 min" },
            { "type": "notes", "title": "Complete Revision Notes", "pages": 250 },
            { "type": "test", "title": "Full Syllabus Mock Test", "questions": 180 },
        ],
    }))
}

/// Admin content listing: all columns, optional type filter.
pub async fn list_admin(
    State(state): State<AppState>,
    Query(query): Query<AdminContentQuery>,
) -> Result<Json<Value>, AppError> {
    let rows = db::content::list_admin(&state.pool, query.content_type.as_deref())
        .await
        .map_err(|e| AppError::store("Failed to fetch content", e))?;

    Ok(Json(json!({ "content": rows })))
}

/// Create a content item from a multipart form, with an optional file part.
pub async fn create_content(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let mut title = None;
    let mut content_type = None;
    let mut content = None;
    let mut chapter_id = None;
    let mut is_premium = false;
    let mut file: Option<(Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Invalid multipart payload: {}", e)))?
    {
        let name = field.name().map(String::from);
        match name.as_deref() {
            Some("title") => title = Some(read_text(field).await?),
            Some("type") => content_type = Some(read_text(field).await?),
            Some("content") => content = Some(read_text(field).await?),
            Some("chapter_id") => chapter_id = read_text(field).await?.parse::<i64>().ok(),
            Some("is_premium") => {
                let value = read_text(field).await?;
                is_premium = matches!(value.as_str(), "1" | "true" | "on");
            }
            Some("file") => {
                let original_name = field.file_name().map(String::from);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(format!("Invalid file upload: {}", e)))?;
                file = Some((original_name, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let title = title.filter(|t| !t.is_empty());
    let content_type = content_type.filter(|t| !t.is_empty());
    let (Some(title), Some(content_type)) = (title, content_type) else {
        return Err(AppError::validation("Title and type are required"));
    };

    let file_url = match file {
        Some((original_name, bytes)) => {
            Some(store_upload(&state.config.upload_dir, original_name.as_deref(), &bytes).await?)
        }
        None => None,
    };

    let item = NewContent {
        title,
        content_type,
        content,
        file_url: file_url.clone(),
        chapter_id,
        is_premium,
    };

    let id = db::content::insert(&state.pool, &item, Utc::now())
        .await
        .map_err(|e| AppError::store("Failed to create content", e))?;

    info!(
        event = "content.created",
        content_id = %id,
        content_type = %item.content_type,
        has_file = file_url.is_some(),
        "Content created"
    );

    Ok(Json(json!({
        "message": "Content created successfully",
        "id": id,
        "fileUrl": file_url,
    })))
}

/// Delete a content item and, best-effort, its uploaded file.
///
/// A missing or already-deleted file never fails the row delete.
pub async fn delete_content(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let file_url = db::content::file_url(&state.pool, id)
        .await
        .map_err(|e| AppError::store("Database error", e))?;

    if let Some(Some(url)) = file_url {
        remove_upload(&state.config.upload_dir, &url).await;
    }

    let deleted = db::content::delete(&state.pool, id)
        .await
        .map_err(|e| AppError::store("Failed to delete content", e))?;

    if deleted == 0 {
        return Err(AppError::not_found("Content not found"));
    }

    info!(event = "content.deleted", content_id = %id, "Content deleted");

    Ok(Json(json!({ "message": "Content deleted successfully" })))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::validation(format!("Invalid multipart payload: {}", e)))
}

/// Write the uploaded bytes under a generated name, preserving the original
/// extension, and return the public URL.
async fn store_upload(
    upload_dir: &str,
    original_name: Option<&str>,
    bytes: &[u8],
) -> Result<String, AppError> {
    let extension = original_name
        .and_then(|n| FsPath::new(n).extension())
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();
    let stored_name = format!("{}{}", Uuid::new_v4(), extension);

    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| AppError::internal(format!("Failed to create upload directory: {}", e)))?;
    tokio::fs::write(FsPath::new(upload_dir).join(&stored_name), bytes)
        .await
        .map_err(|e| AppError::internal(format!("Failed to store uploaded file: {}", e)))?;

    Ok(format!("/uploads/{}", stored_name))
}

/// Best-effort file removal; failures are logged and swallowed.
async fn remove_upload(upload_dir: &str, file_url: &str) {
    let Some(name) = file_url.strip_prefix("/uploads/") else {
        warn!(file_url = %file_url, "Unrecognized file URL, skipping file removal");
        return;
    };

    let path = FsPath::new(upload_dir).join(name);
    if let Err(err) = tokio::fs::remove_file(&path).await {
        warn!(error = %err, path = %path.display(), "Failed to delete content file");
    }
}
