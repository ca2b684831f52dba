use anyhow::Context;
use posts_api::{
    AppState,
    config::Config,
    db::PgPostStore,
    storage::S3Storage,
};
use std::net::SocketAddr;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env().context("invalid configuration")?;

    // Shared clients, built once
    let posts = PgPostStore::connect(&config.database_url, config.database_max_connections)
        .await
        .context("failed to connect to database")?;
    posts
        .sync_schema()
        .await
        .context("failed to synchronize schema")?;
    let storage = S3Storage::new(config.storage.clone()).await;

    let state = AppState::new(posts, storage);
    let app = posts_api::app(state, config.max_upload_bytes);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("Server running on http://{}", addr);
    info!("API Endpoints:");
    info!("  GET    /health           - Health check");
    info!("  GET    /posts            - List posts (paginated, filterable)");
    info!("  POST   /posts            - Create post with image (multipart)");
    info!("  GET    /posts/{{id}}       - Get specific post");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown"),
        _ = terminate => info!("Received SIGTERM, starting shutdown"),
    }
}
