use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use qiming::config::Config;
use qiming::coze::CozeClient;
use qiming::rate_limit::RateLimiter;
use qiming::state::{AppState, DbPool};
use qiming::{app, db};

pub struct TestApp {
    pub base_url: String,
    #[allow(dead_code)]
    pub db: DbPool,
    // Keeps the database file alive for the duration of the test
    _data_dir: TempDir,
}

#[allow(dead_code)]
pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

pub async fn spawn_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let data_dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.database.path = Some(data_dir.path().join("test.db"));
    configure(&mut config);

    let pool = db::create_pool(config.db_path()).expect("Failed to create test database");
    db::run_migrations(&pool).expect("Failed to run migrations");

    let rate_limiter = Arc::new(RateLimiter::new(
        config.limits.rate_limit_requests,
        Duration::from_secs(config.limits.rate_limit_window_minutes * 60),
    ));

    let state = AppState {
        db: pool.clone(),
        coze: CozeClient::new(config.coze.clone()),
        rate_limiter,
        config,
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app(state);
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp {
        base_url: format!("http://{}", addr),
        db: pool,
        _data_dir: data_dir,
    }
}

/// A client with a cookie store, so session cookies round-trip.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .unwrap()
}
