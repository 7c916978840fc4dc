use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::auth::{self, session};
use crate::db::models::UserProfile;
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

// -- Cookie helpers --

fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    let max_age_secs = max_age_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        name, token, max_age_secs
    )
}

fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0", name)
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == name {
                Some(val.to_string())
            } else {
                None
            }
        })
}

fn login_response(state: &AppState, user: crate::db::models::User) -> AppResult<Response> {
    let token = session::create_session(&state.db, &user.id, state.config.auth.session_hours)?;
    let cookie = session_cookie(
        &state.config.auth.cookie_name,
        &token,
        state.config.auth.session_hours,
    );
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "success": true, "user": UserProfile::from(user) })),
    )
        .into_response())
}

// -- Handlers --

/// POST /api/auth/register — create an account and log it in.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<Credentials>,
) -> AppResult<Response> {
    let user = auth::register_user(&state.db, &req.username, &req.password)?;
    login_response(&state, user)
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<Credentials>,
) -> AppResult<Response> {
    let user = auth::verify_login(&state.db, &state.config.auth, &req.username, &req.password)?;
    login_response(&state, user)
}

/// POST /api/auth/logout — delete the session and clear the cookie.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    if let Some(token) = cookie_value(&headers, &state.config.auth.cookie_name) {
        session::delete_session(&state.db, &token)?;
    }
    Ok((
        [(
            header::SET_COOKIE,
            clear_session_cookie(&state.config.auth.cookie_name),
        )],
        Json(json!({ "success": true, "message": "logged out" })),
    )
        .into_response())
}

/// POST /api/auth/guest — allocate a guest identity and a session for it.
pub async fn guest(State(state): State<AppState>) -> AppResult<Response> {
    let user = auth::create_guest(&state.db)?;
    login_response(&state, user)
}

/// GET /api/auth/me — profile of the current user.
pub async fn me(State(state): State<AppState>, user: CurrentUser) -> AppResult<Json<UserProfile>> {
    let user = auth::load_user(&state.db, &user.id)?;
    Ok(Json(user.into()))
}
