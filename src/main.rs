//! doc-extractor server binary
//!
//! Loads configuration from the environment, serves the REST API and shuts
//! down gracefully on SIGINT/SIGTERM. Exits non-zero if the server cannot
//! start.

use doc_extractor::{Config, DocumentExtractor, serve_with_shutdown};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "doc_extractor=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = Config::from_env()?;
    let extractor = DocumentExtractor::new(config).await?;

    serve_with_shutdown(extractor).await?;

    Ok(())
}
