//! Task management handlers.

use super::{CreateTaskRequest, TaskAck, TaskStatusResponse, parse_task_id};
use crate::api::AppState;
use crate::error::{Error, Result};
use crate::types::OutputMode;
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// POST /extract - Queue an archive for extraction
#[utoipa::path(
    post,
    path = "/extract",
    tag = "tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskAck),
        (status = 400, description = "Invalid mode, url or body", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn create_task(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) =
        payload.map_err(|e| Error::InvalidInput(format!("invalid request body: {}", e.body_text())))?;

    // Validate mode before anything is created
    let mode = match request.mode.as_deref() {
        Some(raw) => raw.parse::<OutputMode>()?,
        None => OutputMode::default(),
    };

    let task = state.extractor.submit(&request.url, mode).await?;

    Ok((StatusCode::CREATED, Json(TaskAck::from(&task))).into_response())
}

/// GET /status/:task_id - Task snapshot
#[utoipa::path(
    get,
    path = "/status/{task_id}",
    tag = "tasks",
    params(
        ("task_id" = String, Path, description = "Task ID (UUID)")
    ),
    responses(
        (status = 200, description = "Task snapshot", body = TaskStatusResponse),
        (status = 404, description = "Task not found", body = crate::error::ApiError)
    )
)]
pub async fn get_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskStatusResponse>> {
    let id = parse_task_id(&task_id)?;
    let task = state.extractor.status(id).await?;
    Ok(Json(task.into()))
}

/// POST /cancel/:task_id - Request cancellation
#[utoipa::path(
    post,
    path = "/cancel/{task_id}",
    tag = "tasks",
    params(
        ("task_id" = String, Path, description = "Task ID (UUID)")
    ),
    responses(
        (status = 202, description = "Cancellation requested", body = TaskAck),
        (status = 404, description = "Task not found", body = crate::error::ApiError),
        (status = 409, description = "Task already finished", body = crate::error::ApiError)
    )
)]
pub async fn cancel_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Response> {
    let id = parse_task_id(&task_id)?;
    let task = state.extractor.cancel(id).await?;
    Ok((StatusCode::ACCEPTED, Json(TaskAck::from(&task))).into_response())
}

/// GET /tasks - All tasks, newest first
#[utoipa::path(
    get,
    path = "/tasks",
    tag = "tasks",
    responses(
        (status = 200, description = "All task snapshots", body = Vec<TaskStatusResponse>)
    )
)]
pub async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<TaskStatusResponse>>> {
    let tasks = state.extractor.list().await?;
    Ok(Json(tasks.into_iter().map(Into::into).collect()))
}
