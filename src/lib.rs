// Library exports for qiming
// This allows integration tests and the binaries to share the modules

pub mod auth;
pub mod config;
pub mod coze;
pub mod db;
pub mod error;
pub mod extractors;
pub mod rate_limit;
pub mod routes;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the application router with all middleware applied.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::auth::router())
        .merge(routes::history::router())
        .merge(routes::image_history::router())
        .merge(routes::suggestions::router())
        .merge(routes::generate::router())
        .merge(routes::generator_state::router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::limit,
        ))
        .layer(DefaultBodyLimit::max(state.config.limits.max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
