//! Server bootstrap: logging, configuration, store, admin seed, serve.

use anyhow::Context;
use tracing::info;

use studyhall::admin::seed_admin_account;
use studyhall::config::AppConfig;
use studyhall::db::create_pool;
use studyhall::events::SecurityEvent;
use studyhall::security_event;
use studyhall::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Structured JSON logging; RUST_LOG overrides the default filter.
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,studyhall=debug".into()),
        )
        .json()
        .init();

    let config = AppConfig::from_env();

    let pool = create_pool(&config.database)
        .await
        .context("Failed to initialize database")?;

    seed_admin_account(&pool, &config)
        .await
        .context("Failed to seed admin account")?;

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .context("Failed to create upload directory")?;

    let addr = format!("0.0.0.0:{}", config.port);
    let state = AppState::new(config, pool);
    let app = build_router(state);

    security_event!(SecurityEvent::SystemStartup, address = %addr, "Server starting");
    info!(address = %addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
