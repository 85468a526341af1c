//! Artifact delivery handlers.
//!
//! Both routes stream from the handle opened by
//! [`DocumentExtractor::artifact`](crate::DocumentExtractor::artifact); the
//! file is never read into memory.

use super::parse_task_id;
use crate::api::AppState;
use crate::error::Result;
use crate::runner::Artifact;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

/// GET /view/:task_id - Stream the artifact inline
#[utoipa::path(
    get,
    path = "/view/{task_id}",
    tag = "artifacts",
    params(
        ("task_id" = String, Path, description = "Task ID (UUID)")
    ),
    responses(
        (status = 200, description = "Artifact content (application/pdf or text/plain)"),
        (status = 404, description = "Task or artifact not found", body = crate::error::ApiError),
        (status = 409, description = "Task not completed", body = crate::error::ApiError)
    )
)]
pub async fn view_artifact(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Response> {
    let artifact = state.extractor.artifact(parse_task_id(&task_id)?).await?;

    let mut response = stream_artifact(artifact, HeaderValue::from_static("inline"));
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );

    Ok(response)
}

/// GET /download/:task_id - Stream the artifact as an attachment
#[utoipa::path(
    get,
    path = "/download/{task_id}",
    tag = "artifacts",
    params(
        ("task_id" = String, Path, description = "Task ID (UUID)")
    ),
    responses(
        (status = 200, description = "Artifact content as attachment"),
        (status = 404, description = "Task or artifact not found", body = crate::error::ApiError),
        (status = 409, description = "Task not completed", body = crate::error::ApiError)
    )
)]
pub async fn download_artifact(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Response> {
    let artifact = state.extractor.artifact(parse_task_id(&task_id)?).await?;

    let disposition = format!(
        "attachment; filename=\"output.{}\"",
        artifact.mode.extension()
    );
    let disposition = HeaderValue::from_str(&disposition)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok(stream_artifact(artifact, disposition))
}

fn stream_artifact(artifact: Artifact, disposition: HeaderValue) -> Response {
    tracing::debug!(
        task_id = %artifact.task_id,
        path = ?artifact.path,
        bytes = artifact.len,
        "streaming artifact"
    );

    let content_type = artifact.mode.content_type();
    let len = artifact.len;
    let body = Body::from_stream(ReaderStream::new(artifact.file));

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CONTENT_LENGTH, HeaderValue::from(len)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}
