use mediator::Request;
use predomics_common::types::JobStatus;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::analysis::types::{Job, JobView, JOB_COLUMNS};
use crate::features::shared::{Paginated, PaginationParams};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListJobsQuery {
    #[serde(skip)]
    pub project_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListJobsError {
    #[error("{0}")]
    InvalidPagination(&'static str),

    #[error("Project '{0}' not found")]
    ProjectNotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<Paginated<JobView>, ListJobsError>> for ListJobsQuery {}

impl crate::cqrs::middleware::Query for ListJobsQuery {}

#[tracing::instrument(skip(pool))]
pub async fn handle(pool: PgPool, query: ListJobsQuery) -> Result<Paginated<JobView>, ListJobsError> {
    let params = PaginationParams::new(query.page, query.per_page);
    params.validate().map_err(ListJobsError::InvalidPagination)?;

    let project_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM projects WHERE id = $1)")
        .bind(query.project_id)
        .fetch_one(&pool)
        .await?;
    if !project_exists {
        return Err(ListJobsError::ProjectNotFound(query.project_id));
    }

    let status = query.status.map(|s| s.as_str());

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM jobs WHERE project_id = $1 AND ($2::TEXT IS NULL OR status = $2)",
    )
    .bind(query.project_id)
    .bind(status)
    .fetch_one(&pool)
    .await?;

    let jobs = sqlx::query_as::<_, Job>(&format!(
        r#"
        SELECT {}
        FROM jobs
        WHERE project_id = $1 AND ($2::TEXT IS NULL OR status = $2)
        ORDER BY created_at DESC, id ASC
        LIMIT $3 OFFSET $4
        "#,
        JOB_COLUMNS
    ))
    .bind(query.project_id)
    .bind(status)
    .bind(params.per_page())
    .bind(params.offset())
    .fetch_all(&pool)
    .await?;

    Ok(Paginated::from_items(jobs, &params, total).map(JobView::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{TestJob, TestProject};

    #[sqlx::test]
    async fn test_newest_first_with_status_filter(pool: PgPool) -> sqlx::Result<()> {
        let project = TestProject::new("p").insert(&pool).await?;
        let first = TestJob::new(project).insert(&pool).await?;
        sqlx::query(
            "UPDATE jobs SET status = 'failed', created_at = NOW() - INTERVAL '1 hour' WHERE id = $1",
        )
        .bind(first)
        .execute(&pool)
        .await?;
        let second = TestJob::new(project).insert(&pool).await?;

        let all = handle(
            pool.clone(),
            ListJobsQuery {
                project_id: project,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(all.items.iter().map(|j| j.id).collect::<Vec<_>>(), vec![second, first]);

        let pending = handle(
            pool.clone(),
            ListJobsQuery {
                project_id: project,
                status: Some(JobStatus::Pending),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(pending.pagination.total, 1);
        assert_eq!(pending.items[0].id, second);

        let err = handle(
            pool,
            ListJobsQuery {
                project_id: Uuid::new_v4(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ListJobsError::ProjectNotFound(_)));
        Ok(())
    }
}
