use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use ecostay::config::AppConfig;
use ecostay::db;
use ecostay::handlers;
use ecostay::services::clock::SystemClock;
use ecostay::services::sweep;
use ecostay::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db_with_timeout(&config.database_url, config.busy_timeout)?;
    tracing::info!(database = %config.database_url, "database ready");

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        clock: Box::new(SystemClock),
    });

    tracing::info!(
        interval_secs = config.sweep_interval.as_secs(),
        "starting booking completion sweep"
    );
    tokio::spawn(sweep::run_periodic(state.clone()));

    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
