//! REST API server module
//!
//! Exposes task creation, status polling, artifact delivery and an event
//! stream over HTTP. Handlers only translate between HTTP and the
//! [`DocumentExtractor`]; no extraction work happens in a request.

use crate::{Config, DocumentExtractor, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Tasks
/// - `POST /extract` - Queue an archive for extraction
/// - `GET /status/:task_id` - Task snapshot
/// - `POST /cancel/:task_id` - Request cancellation
/// - `GET /tasks` - All tasks, newest first
///
/// ## Artifacts
/// - `GET /view/:task_id` - Stream the artifact inline
/// - `GET /download/:task_id` - Stream the artifact as an attachment
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /events` - Server-sent events stream
pub fn create_router(extractor: Arc<DocumentExtractor>, config: Arc<Config>) -> Router {
    let state = AppState::new(extractor, config.clone());

    let router = Router::new()
        // Tasks
        .route("/extract", post(routes::create_task))
        .route("/status/:task_id", get(routes::get_status))
        .route("/cancel/:task_id", post(routes::cancel_task))
        .route("/tasks", get(routes::list_tasks))
        // Artifacts
        .route("/view/:task_id", get(routes::view_artifact))
        .route("/download/:task_id", get(routes::download_artifact))
        // System
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    // Apply CORS middleware if enabled in config (outermost)
    if config.api.cors_enabled {
        router.layer(build_cors_layer(&config.api.cors_origins))
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin; otherwise only the listed
/// origins are allowed. Entries that are not valid header values are ignored.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Binds a TCP listener and serves the router until the server stops.
///
/// # Example
///
/// ```no_run
/// use doc_extractor::{Config, DocumentExtractor};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let extractor = Arc::new(DocumentExtractor::new((*config).clone()).await?);
///
/// // Start API server (blocks until shutdown)
/// doc_extractor::api::start_api_server(extractor, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(extractor: Arc<DocumentExtractor>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(extractor, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
