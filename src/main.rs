use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use bizcard_api::{
    config,
    database::{MemoryStore, PgStore},
    router, AppState,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("bizcard_api=debug,tower_http=debug")),
        )
        .init();

    let mut config = config::config().clone();
    config.validate()?;
    tracing::info!("Starting BizCard API in {:?} mode", config.environment);

    let bind_addr = config.bind_addr();
    let (state, pg) = match config.database.url.clone() {
        Some(url) => {
            let store = Arc::new(
                PgStore::connect(&url, &config.database)
                    .await
                    .context("failed to connect to database")?,
            );
            store.migrate().await.context("failed to prepare database schema")?;
            (AppState::new(config, store.clone()), Some(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store (data is lost on restart)");
            (AppState::new(config, Arc::new(MemoryStore::new())), None)
        }
    };

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("BizCard API listening on http://{}", bind_addr);

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    if let Some(store) = pg {
        store.close().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
