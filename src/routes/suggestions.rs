use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use rusqlite::params;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::models::Suggestion;
use crate::error::{AppError, AppResult};
use crate::routes::history::required_username;
use crate::state::AppState;

/// Longest accepted suggestion, in characters.
const MAX_CONTENT_CHARS: usize = 1000;

#[derive(Deserialize)]
pub struct CreateSuggestionRequest {
    pub content: Option<String>,
    pub username: Option<String>,
}

/// Pagination parameters are accepted for compatibility but not applied.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionsQuery {
    #[allow(dead_code)]
    pub page: Option<u32>,
    #[allow(dead_code)]
    pub page_size: Option<u32>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/suggestions", get(list).post(create))
}

/// GET /api/suggestions — the full list, oldest first.
async fn list(
    State(state): State<AppState>,
    Query(_query): Query<SuggestionsQuery>,
) -> AppResult<Json<Vec<Suggestion>>> {
    let conn = state.db.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, username, content, created_at FROM suggestions ORDER BY rowid ASC",
    )?;

    let suggestions = stmt
        .query_map([], |row| {
            Ok(Suggestion {
                id: row.get(0)?,
                username: row.get(1)?,
                content: row.get(2)?,
                timestamp: row.get(3)?,
            })
        })?
        .filter_map(|r| r.ok())
        .collect();

    Ok(Json(suggestions))
}

/// POST /api/suggestions
async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateSuggestionRequest>,
) -> AppResult<Json<Value>> {
    let username = required_username(req.username.as_deref())?;
    let content = req
        .content
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("content is required".into()))?;

    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(AppError::BadRequest(format!(
            "content must be {} characters or less",
            MAX_CONTENT_CHARS
        )));
    }

    let suggestion = Suggestion {
        id: uuid::Uuid::now_v7().to_string(),
        username,
        content: content.to_string(),
        timestamp: Utc::now().to_rfc3339(),
    };

    let conn = state.db.get()?;
    conn.execute(
        "INSERT INTO suggestions (id, username, content, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            suggestion.id,
            suggestion.username,
            suggestion.content,
            suggestion.timestamp
        ],
    )?;

    Ok(Json(json!({
        "success": true,
        "message": "suggestion saved",
        "suggestion": suggestion,
    })))
}
