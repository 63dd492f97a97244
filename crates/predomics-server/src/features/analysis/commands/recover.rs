//! Fail jobs left behind by a previous server process
//!
//! Engine runs are in-process tasks, so a job still `pending` or `running`
//! at startup has nothing driving it anymore.

use mediator::Request;
use predomics_common::types::JobStatus;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

pub const INTERRUPTED_MESSAGE: &str = "interrupted by server restart";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecoverInterruptedJobsCommand;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecoverInterruptedJobsResponse {
    pub failed_job_ids: Vec<Uuid>,
}

#[derive(Debug, thiserror::Error)]
pub enum RecoverInterruptedJobsError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<RecoverInterruptedJobsResponse, RecoverInterruptedJobsError>>
    for RecoverInterruptedJobsCommand
{
}

impl crate::cqrs::middleware::Command for RecoverInterruptedJobsCommand {}

#[tracing::instrument(skip(pool, _command))]
pub async fn handle(
    pool: PgPool,
    _command: RecoverInterruptedJobsCommand,
) -> Result<RecoverInterruptedJobsResponse, RecoverInterruptedJobsError> {
    let from: Vec<&str> = JobStatus::predecessors(JobStatus::Failed)
        .iter()
        .map(|s| s.as_str())
        .collect();

    let failed_job_ids: Vec<Uuid> = sqlx::query_scalar(
        r#"
        UPDATE jobs
        SET status = 'failed', error_message = $1, completed_at = NOW(), updated_at = NOW()
        WHERE status = ANY($2)
        RETURNING id
        "#,
    )
    .bind(INTERRUPTED_MESSAGE)
    .bind(&from)
    .fetch_all(&pool)
    .await?;

    if !failed_job_ids.is_empty() {
        tracing::warn!(count = failed_job_ids.len(), "Marked interrupted jobs as failed");
    }

    Ok(RecoverInterruptedJobsResponse { failed_job_ids })
}
