//! Atelier HTTP server binary.
//!
//! Loads configuration (see [`atelier::AppConfig::load`]) and serves the
//! search API until interrupted. Diagnostic output goes to stderr.

use atelier::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("atelier-server starting");

    let config = AppConfig::load().map_err(|e| anyhow::anyhow!("failed to load config: {e}"))?;

    atelier::server::run(config).await.map_err(|e| {
        tracing::error!(error = %e, "atelier-server exited with error");
        anyhow::anyhow!("atelier-server failed: {e}")
    })
}
