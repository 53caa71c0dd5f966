// Main entry point for the media upload relay

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uploader_core::{kernel::ServerDeps, server::build_app, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,uploader_core=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting media upload relay");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        status_dir = %config.status_dir.display(),
        temp_dir = %config.temp_dir.display(),
        channels = ?config.channel_router.channels(),
        wordpress = config.wordpress.is_some(),
        "Configuration loaded"
    );

    // Wire clients and status stores
    let deps = ServerDeps::from_config(&config).context("Failed to initialize dependencies")?;
    let app = build_app(Arc::new(deps));

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app.into_make_service())
        .await
        .context("Server error")?;

    Ok(())
}
