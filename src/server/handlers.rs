use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use crate::domain::{DocumentPair, TaskRecord};
use crate::server::{
    AppState,
    error::{ApiError, ApiResult},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub cv_url: String,
    pub report_url: String,
}

impl From<CreateTaskRequest> for DocumentPair {
    fn from(request: CreateTaskRequest) -> Self {
        DocumentPair::new(request.cv_url, request.report_url)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskResponse {
    pub task_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub tasks: usize,
}

/// `POST /scrape-cv` with a JSON body
pub async fn create_task(
    State(state): State<AppState>,
    Json(payload): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<CreateTaskResponse>)> {
    submit(&state, payload).await
}

/// `GET /scrape-cv?cv_url=..&report_url=..`
pub async fn create_task_from_query(
    State(state): State<AppState>,
    Query(payload): Query<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<CreateTaskResponse>)> {
    submit(&state, payload).await
}

async fn submit(
    state: &AppState,
    payload: CreateTaskRequest,
) -> ApiResult<(StatusCode, Json<CreateTaskResponse>)> {
    let task_id = state.registry.create(payload.into()).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateTaskResponse {
            task_id,
            status: "accepted".to_string(),
        }),
    ))
}

/// `GET /status/:task_id`
pub async fn get_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<TaskRecord>> {
    let record = state
        .registry
        .get_status(&task_id)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(record))
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        tasks: state.registry.len().await,
    })
}
