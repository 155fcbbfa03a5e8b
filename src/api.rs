//! HTTP front end: job submission and health.
//!
//! A thin layer over the pipeline. Requests are validated synchronously;
//! accepted jobs run as background tasks and report through the callback
//! contract, so the submission response is only a provisional acknowledgment.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::job::BuildRequest;
use crate::pipeline::JobPipeline;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Body returned for an accepted job.
#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub message: String,
    pub build_id: String,
    pub client_id: String,
    pub status: String,
}

/// Builds the service router.
pub fn router(pipeline: Arc<JobPipeline>) -> Router {
    Router::new()
        .route("/build", post(submit_build))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(pipeline)
}

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// POST /build
///
/// Validates the request, spawns the job, and answers 202 immediately.
pub async fn submit_build(
    State(pipeline): State<Arc<JobPipeline>>,
    Json(request): Json<BuildRequest>,
) -> ApiResult<(StatusCode, Json<AcceptedResponse>)> {
    tracing::info!(source = %request.source_url, client_id = %request.client_id, "build request received");

    let client_id = request.client_id.clone();
    let job_id = pipeline
        .submit(request)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            message: "Build request accepted".to_string(),
            build_id: job_id.to_string(),
            client_id,
            status: "accepted".to_string(),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuilderConfig;

    #[tokio::test]
    async fn test_health_reports_healthy() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_submit_rejects_bad_source_synchronously() {
        let pipeline = Arc::new(JobPipeline::new(BuilderConfig::default()));
        let request = BuildRequest {
            source_url: "ftp://x/a.rar".to_string(),
            branch: None,
            client_id: "c1".to_string(),
            callback_url: None,
        };

        let result = submit_build(State(pipeline), Json(request)).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_submit_rejects_missing_client_id() {
        let pipeline = Arc::new(JobPipeline::new(BuilderConfig::default()));
        let request = BuildRequest {
            source_url: "https://x/repo.git".to_string(),
            branch: None,
            client_id: "".to_string(),
            callback_url: None,
        };

        let result = submit_build(State(pipeline), Json(request)).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }
}
