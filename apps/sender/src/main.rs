//! hubdrop sender entry point.

mod app;
mod config;
mod spool;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting hubdrop sender"
    );

    let path = config::config_path(std::env::args());
    let config = config::Config::load(&path)?;
    tracing::info!(
        path = %path.display(),
        device = %config.device.device_id,
        files = config.files.len(),
        "configuration loaded"
    );

    let rt = tokio::runtime::Runtime::new()?;
    let outcomes = rt.block_on(app::run(config))?;

    let failed = outcomes.iter().filter(|o| !o.status.is_success()).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} transfers failed", outcomes.len());
    }

    tracing::info!(sent = outcomes.len(), "all transfers completed");
    Ok(())
}
