//! IDLens - identity document analysis pipeline.
//!
//! A tool for analyzing directories of identity-document images with a
//! vision language model and writing structured per-image records.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    // Initialize logging based on verbosity
    let default_filter = if idlens::cli::is_verbose() {
        "idlens=info"
    } else {
        "idlens=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Run CLI
    idlens::cli::run().await
}
