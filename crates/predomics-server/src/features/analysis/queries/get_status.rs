use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::analysis::types::{Job, JobView, JOB_COLUMNS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetJobStatusQuery {
    pub project_id: Uuid,
    pub job_id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum GetJobStatusError {
    #[error("Job '{0}' not found")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<JobView, GetJobStatusError>> for GetJobStatusQuery {}

impl crate::cqrs::middleware::Query for GetJobStatusQuery {}

/// Load a job of a project
pub(crate) async fn fetch_job(pool: &PgPool, project_id: Uuid, job_id: Uuid) -> Result<Option<Job>, sqlx::Error> {
    sqlx::query_as::<_, Job>(&format!(
        "SELECT {} FROM jobs WHERE id = $1 AND project_id = $2",
        JOB_COLUMNS
    ))
    .bind(job_id)
    .bind(project_id)
    .fetch_optional(pool)
    .await
}

#[tracing::instrument(skip(pool))]
pub async fn handle(pool: PgPool, query: GetJobStatusQuery) -> Result<JobView, GetJobStatusError> {
    let job = fetch_job(&pool, query.project_id, query.job_id)
        .await?
        .ok_or(GetJobStatusError::NotFound(query.job_id))?;
    Ok(JobView::from(job))
}
