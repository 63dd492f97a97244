//! The result bundle of a completed job

use mediator::Request;
use predomics_common::types::JobStatus;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::get_status::fetch_job;
use crate::engine::ResultBundle;
use crate::storage::Storage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetJobResultQuery {
    pub project_id: Uuid,
    pub job_id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum GetJobResultError {
    #[error("Job '{0}' not found")]
    NotFound(Uuid),

    #[error("Job '{job_id}' is {status}; results are not available yet")]
    NotReady { job_id: Uuid, status: JobStatus },

    #[error("Job '{job_id}' failed: {message}")]
    Failed { job_id: Uuid, message: String },

    #[error("Stored result of job '{job_id}' could not be read: {reason}")]
    Unreadable { job_id: Uuid, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<ResultBundle, GetJobResultError>> for GetJobResultQuery {}

impl crate::cqrs::middleware::Query for GetJobResultQuery {}

#[tracing::instrument(skip(pool, storage))]
pub async fn handle(
    pool: PgPool,
    storage: Storage,
    query: GetJobResultQuery,
) -> Result<ResultBundle, GetJobResultError> {
    let job = fetch_job(&pool, query.project_id, query.job_id)
        .await?
        .ok_or(GetJobResultError::NotFound(query.job_id))?;

    match job.status {
        JobStatus::Pending | JobStatus::Running => {
            return Err(GetJobResultError::NotReady {
                job_id: job.id,
                status: job.status,
            })
        },
        JobStatus::Failed => {
            return Err(GetJobResultError::Failed {
                job_id: job.id,
                message: job.error_message.unwrap_or_else(|| "unknown error".to_string()),
            })
        },
        JobStatus::Completed => {},
    }

    let unreadable = |reason: String| GetJobResultError::Unreadable {
        job_id: job.id,
        reason,
    };

    let key = job
        .result_key
        .as_deref()
        .ok_or_else(|| unreadable("no result key recorded".to_string()))?;
    let bytes = storage.download(key).await.map_err(|e| unreadable(e.to_string()))?;
    let bundle = serde_json::from_slice(&bytes).map_err(|e| unreadable(e.to_string()))?;

    Ok(ResultBundle(bundle))
}
