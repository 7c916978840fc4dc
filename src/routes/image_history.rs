use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use rusqlite::params;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::models::ImageHistoryRecord;
use crate::error::AppResult;
use crate::routes::history::required_username;
use crate::state::{AppState, DbPool};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveImageHistoryRequest {
    pub username: Option<String>,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

#[derive(Deserialize)]
pub struct ImageHistoryQuery {
    pub username: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/image-history/get", get(list))
        .route("/api/image-history/save", post(save))
}

/// GET /api/image-history/get?username= — records whose `user` matches, in
/// insertion order.
async fn list(
    State(state): State<AppState>,
    Query(query): Query<ImageHistoryQuery>,
) -> AppResult<Json<Vec<ImageHistoryRecord>>> {
    let username = required_username(query.username.as_deref())?;

    let conn = state.db.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, username, prompt, urls_json, created_at
         FROM image_history WHERE username = ?1 ORDER BY rowid ASC",
    )?;

    let records = stmt
        .query_map(params![username], |row| {
            let urls_json: String = row.get(3)?;
            Ok(ImageHistoryRecord {
                id: row.get(0)?,
                user: row.get(1)?,
                prompt: row.get(2)?,
                image_urls: serde_json::from_str(&urls_json).unwrap_or_default(),
                timestamp: row.get(4)?,
            })
        })?
        .filter_map(|r| r.ok())
        .collect();

    Ok(Json(records))
}

/// POST /api/image-history/save — server assigns id and timestamp.
async fn save(
    State(state): State<AppState>,
    Json(req): Json<SaveImageHistoryRequest>,
) -> AppResult<Json<Value>> {
    let username = required_username(req.username.as_deref())?;
    let record = insert_record(&state.db, &username, &req.prompt, &req.image_urls)?;

    Ok(Json(json!({
        "success": true,
        "message": "image history saved",
        "record": record,
    })))
}

/// Append an image-history record. Also used by the generate route when an
/// image stream completes.
pub fn insert_record(
    pool: &DbPool,
    username: &str,
    prompt: &str,
    image_urls: &[String],
) -> AppResult<ImageHistoryRecord> {
    let record = ImageHistoryRecord {
        id: uuid::Uuid::now_v7().to_string(),
        user: username.to_string(),
        prompt: prompt.to_string(),
        image_urls: image_urls.to_vec(),
        timestamp: Utc::now().to_rfc3339(),
    };

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO image_history (id, username, prompt, urls_json, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            record.id,
            record.user,
            record.prompt,
            serde_json::to_string(&record.image_urls)?,
            record.timestamp,
        ],
    )?;

    Ok(record)
}
