use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use rusqlite::params;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::models::{GeneratedName, HistoryRecord};
use crate::error::{AppError, AppResult};
use crate::state::{AppState, DbPool};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveHistoryRequest {
    pub username: Option<String>,
    #[serde(default)]
    pub english_name: String,
    #[serde(default)]
    pub character_count: String,
    #[serde(default)]
    pub unwanted_hanzi: String,
    #[serde(default)]
    pub generated_names: Vec<GeneratedName>,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub username: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/history/save", post(save))
        .route("/api/history/get", get(list))
}

/// POST /api/history/save
async fn save(
    State(state): State<AppState>,
    Json(req): Json<SaveHistoryRequest>,
) -> AppResult<Json<Value>> {
    let username = required_username(req.username.as_deref())?;

    insert_record(
        &state.db,
        &username,
        &req.english_name,
        &req.character_count,
        &req.unwanted_hanzi,
        &req.generated_names,
    )?;

    Ok(Json(json!({ "success": true, "message": "history saved" })))
}

/// GET /api/history/get?username=
async fn list(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<Vec<HistoryRecord>>> {
    let username = required_username(query.username.as_deref())?;

    let conn = state.db.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, username, english_name, character_count, unwanted_hanzi, names_json, created_at
         FROM gen_history WHERE username = ?1 ORDER BY rowid ASC",
    )?;

    let records = stmt
        .query_map(params![username], |row| {
            let names_json: String = row.get(5)?;
            Ok(HistoryRecord {
                id: row.get(0)?,
                username: row.get(1)?,
                english_name: row.get(2)?,
                character_count: row.get(3)?,
                unwanted_hanzi: row.get(4)?,
                generated_names: serde_json::from_str(&names_json).unwrap_or_default(),
                timestamp: row.get(6)?,
            })
        })?
        .filter_map(|r| r.ok())
        .collect();

    Ok(Json(records))
}

/// Append a generation-history record. Also used by the generate route to
/// persist results when a stream completes.
pub fn insert_record(
    pool: &DbPool,
    username: &str,
    english_name: &str,
    character_count: &str,
    unwanted_hanzi: &str,
    names: &[GeneratedName],
) -> AppResult<HistoryRecord> {
    let record = HistoryRecord {
        id: uuid::Uuid::now_v7().to_string(),
        username: username.to_string(),
        english_name: english_name.to_string(),
        character_count: character_count.to_string(),
        unwanted_hanzi: unwanted_hanzi.to_string(),
        generated_names: names.to_vec(),
        timestamp: Utc::now().to_rfc3339(),
    };

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO gen_history (id, username, english_name, character_count, unwanted_hanzi, names_json, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.id,
            record.username,
            record.english_name,
            record.character_count,
            record.unwanted_hanzi,
            serde_json::to_string(&record.generated_names)?,
            record.timestamp,
        ],
    )?;

    Ok(record)
}

pub(super) fn required_username(value: Option<&str>) -> AppResult<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::BadRequest("username is required".into()))
}
