//! Progress Handlers
//!
//! Last-write-wins upsert keyed on (user, chapter), and a plain listing of
//! the caller's rows. The user id always comes from the verified claims,
//! never from the request body.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::Claims;
use crate::db;
use crate::error::AppError;
use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveProgressRequest {
    pub chapter_id: Option<i64>,
    pub progress: Option<i64>,
}

/// Upsert the caller's progress for one chapter.
pub async fn save_progress(
    State(state): State<AppState>,
    claims: Claims,
    Json(input): Json<SaveProgressRequest>,
) -> Result<Json<Value>, AppError> {
    let (Some(chapter_id), Some(progress)) = (input.chapter_id, input.progress) else {
        return Err(AppError::validation("Chapter id and progress are required"));
    };

    db::progress::upsert(&state.pool, claims.sub, chapter_id, progress, Utc::now())
        .await
        .map_err(|e| AppError::store("Failed to save progress", e))?;

    Ok(Json(json!({ "message": "Progress saved successfully" })))
}

/// List all progress rows for the caller.
pub async fn list_progress(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Value>, AppError> {
    let rows = db::progress::list_for_user(&state.pool, claims.sub)
        .await
        .map_err(|e| AppError::store("Failed to fetch progress", e))?;

    Ok(Json(json!({ "progress": rows })))
}
