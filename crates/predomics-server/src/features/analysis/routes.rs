//! Analysis routes
//!
//! - `POST /api/analysis/:project_id/run` - Submit a run (202, engine runs in background)
//! - `GET /api/analysis/:project_id/jobs` - List jobs (`status`, paging)
//! - `GET /api/analysis/:project_id/jobs/:job_id` - Job status and progress
//! - `GET /api/analysis/:project_id/jobs/:job_id/detail` - Result bundle

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use super::{
    commands::{SubmitRunCommand, SubmitRunError},
    queries::{
        GetJobResultError, GetJobResultQuery, GetJobStatusError, GetJobStatusQuery, ListJobsError,
        ListJobsQuery,
    },
};
use crate::api::response::{error_response, internal_error, ApiResponse};
use crate::features::FeatureState;

pub fn analysis_routes() -> Router<FeatureState> {
    Router::new()
        .route("/:project_id/run", post(submit_run))
        .route("/:project_id/jobs", get(list_jobs))
        .route("/:project_id/jobs/:job_id", get(get_job_status))
        .route("/:project_id/jobs/:job_id/detail", get(get_job_result))
}

#[tracing::instrument(skip(state, command))]
async fn submit_run(
    State(state): State<FeatureState>,
    Path(project_id): Path<Uuid>,
    Json(mut command): Json<SubmitRunCommand>,
) -> Result<Response, AnalysisApiError> {
    command.project_id = project_id;
    let submitted = super::commands::submit::handle(state.db, command).await?;

    // detached; the outcome is recorded on the job
    state.orchestrator.spawn(submitted.job_id);

    Ok(ApiResponse::accepted(submitted).into_response())
}

#[tracing::instrument(skip(state, query))]
async fn list_jobs(
    State(state): State<FeatureState>,
    Path(project_id): Path<Uuid>,
    Query(mut query): Query<ListJobsQuery>,
) -> Result<Response, AnalysisApiError> {
    query.project_id = project_id;
    let page = super::queries::list::handle(state.db, query).await?;
    let meta = json!({ "pagination": page.pagination });
    Ok(ApiResponse::success_with_meta(page.items, meta).into_response())
}

#[tracing::instrument(skip(state))]
async fn get_job_status(
    State(state): State<FeatureState>,
    Path((project_id, job_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, AnalysisApiError> {
    let job = super::queries::get_status::handle(state.db, GetJobStatusQuery { project_id, job_id }).await?;
    Ok(ApiResponse::success(job).into_response())
}

#[tracing::instrument(skip(state))]
async fn get_job_result(
    State(state): State<FeatureState>,
    Path((project_id, job_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, AnalysisApiError> {
    let bundle = super::queries::get_result::handle(
        state.db,
        state.storage,
        GetJobResultQuery { project_id, job_id },
    )
    .await?;
    Ok(ApiResponse::success(bundle).into_response())
}

#[derive(Debug)]
enum AnalysisApiError {
    Submit(SubmitRunError),
    Status(GetJobStatusError),
    Result(GetJobResultError),
    List(ListJobsError),
}

impl From<SubmitRunError> for AnalysisApiError {
    fn from(err: SubmitRunError) -> Self {
        Self::Submit(err)
    }
}

impl From<GetJobStatusError> for AnalysisApiError {
    fn from(err: GetJobStatusError) -> Self {
        Self::Status(err)
    }
}

impl From<GetJobResultError> for AnalysisApiError {
    fn from(err: GetJobResultError) -> Self {
        Self::Result(err)
    }
}

impl From<ListJobsError> for AnalysisApiError {
    fn from(err: ListJobsError) -> Self {
        Self::List(err)
    }
}

impl IntoResponse for AnalysisApiError {
    fn into_response(self) -> Response {
        match self {
            AnalysisApiError::Submit(SubmitRunError::InvalidConfig(e)) => {
                let details = json!({ "errors": e.0 });
                let body = crate::api::response::ErrorResponse::with_details(
                    "VALIDATION_ERROR",
                    e.to_string(),
                    details,
                );
                (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
            },
            AnalysisApiError::Submit(e @ SubmitRunError::Roles(_)) => {
                error_response(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", e.to_string())
            },
            AnalysisApiError::Submit(
                e @ (SubmitRunError::ProjectNotFound(_) | SubmitRunError::FileNotFound(_)),
            ) => error_response(StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string()),
            AnalysisApiError::Submit(e @ SubmitRunError::ProjectArchived(_)) => {
                error_response(StatusCode::CONFLICT, "CONFLICT", e.to_string())
            },

            AnalysisApiError::Status(e @ GetJobStatusError::NotFound(_)) => {
                error_response(StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
            },

            AnalysisApiError::Result(
                e @ (GetJobResultError::NotFound(_) | GetJobResultError::NotReady { .. }),
            ) => error_response(StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string()),
            AnalysisApiError::Result(e @ GetJobResultError::Failed { .. }) => {
                error_response(StatusCode::CONFLICT, "JOB_FAILED", e.to_string())
            },
            AnalysisApiError::Result(e @ GetJobResultError::Unreadable { .. }) => {
                tracing::error!("Result bundle unavailable: {}", e);
                internal_error()
            },

            AnalysisApiError::List(e @ ListJobsError::InvalidPagination(_)) => {
                error_response(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", e.to_string())
            },
            AnalysisApiError::List(e @ ListJobsError::ProjectNotFound(_)) => {
                error_response(StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
            },

            AnalysisApiError::Submit(SubmitRunError::Database(e))
            | AnalysisApiError::Status(GetJobStatusError::Database(e))
            | AnalysisApiError::Result(GetJobResultError::Database(e))
            | AnalysisApiError::List(ListJobsError::Database(e)) => {
                tracing::error!("Database error in analysis operation: {}", e);
                internal_error()
            },
        }
    }
}
