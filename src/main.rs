//! Codechat - Terminal client for a chat-based AI coding assistant

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "codechat=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Codechat v{}", env!("CARGO_PKG_VERSION"));

    // Run CLI
    codechat::cli::run()?;

    Ok(())
}
