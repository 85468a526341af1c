//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the doc-extractor REST
//! API using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the doc-extractor REST API
///
/// Served as JSON at `/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "doc-extractor REST API",
        version = "0.1.0",
        description = "Queue remote archives for extraction into a single PDF or text document and poll for the result",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development server")
    ),
    paths(
        // Tasks
        crate::api::routes::create_task,
        crate::api::routes::get_status,
        crate::api::routes::cancel_task,
        crate::api::routes::list_tasks,

        // Artifacts
        crate::api::routes::view_artifact,
        crate::api::routes::download_artifact,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::TaskState,
        crate::types::OutputMode,
        crate::types::Stage,
        crate::types::ArchiveType,

        // Config types from config.rs
        crate::config::Config,
        crate::config::StorageConfig,
        crate::config::FetchConfig,
        crate::config::ExtractionConfig,
        crate::config::ConversionConfig,
        crate::config::RunnerConfig,
        crate::config::ApiConfig,

        // API request/response types from routes
        crate::api::routes::CreateTaskRequest,
        crate::api::routes::TaskAck,
        crate::api::routes::TaskStatusResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "tasks", description = "Extraction tasks - Create, poll, cancel and list"),
        (name = "artifacts", description = "Artifacts - View or download the output of a completed task"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events"),
    )
)]
pub struct ApiDoc;
