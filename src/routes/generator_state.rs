use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/generator/state", get(load).put(save))
}

/// GET /api/generator/state — the caller's saved snapshot, or null.
async fn load(State(state): State<AppState>, user: CurrentUser) -> AppResult<Json<Value>> {
    let conn = state.db.get()?;
    let snapshot: Option<String> = conn
        .query_row(
            "SELECT state_json FROM generator_state WHERE user_id = ?1",
            params![user.id],
            |row| row.get(0),
        )
        .optional()?;

    let value = match snapshot {
        Some(raw) => serde_json::from_str(&raw).unwrap_or(Value::Null),
        None => Value::Null,
    };
    Ok(Json(value))
}

/// PUT /api/generator/state — store an opaque snapshot of in-progress
/// generator state so it survives navigating away and back.
async fn save(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(snapshot): Json<Value>,
) -> AppResult<Json<Value>> {
    let conn = state.db.get()?;
    conn.execute(
        "INSERT INTO generator_state (user_id, state_json, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id) DO UPDATE SET state_json = ?2, updated_at = ?3",
        params![
            user.id,
            serde_json::to_string(&snapshot)?,
            Utc::now().to_rfc3339()
        ],
    )?;

    Ok(Json(json!({ "success": true })))
}
