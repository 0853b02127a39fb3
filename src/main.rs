use anyhow::Context;
use outline_studio::AppConfig;
use outline_studio::routes::{AppState, router};
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = AppConfig::from_env();
    tracing::info!("Reading provider configuration from {}", config.config_dir.display());

    // Configuration is read per request, so the state only carries where to find it
    let app = router(AppState::new(config.config_dir));

    let listener = TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
