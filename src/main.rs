use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use qiming::config::{Cli, Config};
use qiming::coze::CozeClient;
use qiming::rate_limit::RateLimiter;
use qiming::state::AppState;
use qiming::{app, db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;
    if config.coze.api_key.is_empty() {
        tracing::warn!("No Coze API key configured; generation endpoints will fail");
    }

    // Initialize database
    let pool = db::create_pool(config.db_path())?;
    db::run_migrations(&pool)?;

    let rate_limiter = Arc::new(RateLimiter::new(
        config.limits.rate_limit_requests,
        Duration::from_secs(config.limits.rate_limit_window_minutes * 60),
    ));

    // Build app state
    let state = AppState {
        db: pool,
        coze: CozeClient::new(config.coze.clone()),
        rate_limiter,
        config: config.clone(),
    };

    let app = app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
