//! Delete a project with its jobs, shares and dataset assignments. Dataset
//! groups survive; stored result bundles are removed best effort.

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::storage::Storage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteProjectCommand {
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeleteProjectResponse {
    pub id: Uuid,
    pub jobs_removed: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteProjectError {
    #[error("Project '{0}' not found")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<DeleteProjectResponse, DeleteProjectError>> for DeleteProjectCommand {}

impl crate::cqrs::middleware::Command for DeleteProjectCommand {}

#[tracing::instrument(skip(pool, storage))]
pub async fn handle(
    pool: PgPool,
    storage: Storage,
    command: DeleteProjectCommand,
) -> Result<DeleteProjectResponse, DeleteProjectError> {
    let mut tx = pool.begin().await?;

    let jobs: Vec<(Uuid, Option<String>)> =
        sqlx::query_as("SELECT id, result_key FROM jobs WHERE project_id = $1")
            .bind(command.id)
            .fetch_all(&mut *tx)
            .await?;

    let deleted = sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(command.id)
        .execute(&mut *tx)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(DeleteProjectError::NotFound(command.id));
    }

    tx.commit().await?;

    let result_keys: Vec<&str> = jobs.iter().filter_map(|(_, key)| key.as_deref()).collect();
    storage.delete_best_effort(result_keys).await;
    tracing::info!(project_id = %command.id, jobs = jobs.len(), "Project deleted");

    Ok(DeleteProjectResponse {
        id: command.id,
        jobs_removed: jobs.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{local_storage, TestDataset, TestJob, TestProject};
    use predomics_common::types::JobStatus;

    #[sqlx::test]
    async fn test_delete_removes_jobs_but_keeps_shared_datasets(pool: PgPool) -> sqlx::Result<()> {
        let (_dir, storage) = local_storage().await;
        let doomed = TestProject::new("doomed").insert(&pool).await?;
        let survivor = TestProject::new("survivor").insert(&pool).await?;
        let shared = TestDataset::new("shared").insert(&pool).await?;
        TestProject::assign(&pool, doomed, shared).await?;
        TestProject::assign(&pool, survivor, shared).await?;

        let result_key = Storage::result_key(doomed, Uuid::new_v4());
        storage.upload(&result_key, b"{}".to_vec(), None).await.unwrap();
        TestJob::new(doomed)
            .with_status(JobStatus::Completed)
            .with_result_key(&result_key)
            .insert(&pool)
            .await?;
        TestJob::new(doomed).with_status(JobStatus::Failed).insert(&pool).await?;
        TestJob::new(survivor).insert(&pool).await?;

        let response = handle(pool.clone(), storage.clone(), DeleteProjectCommand { id: doomed })
            .await
            .unwrap();
        assert_eq!(response.jobs_removed, 2);

        let jobs_left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs")
            .fetch_one(&pool)
            .await?;
        assert_eq!(jobs_left, 1);

        let dataset_left: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM datasets WHERE id = $1)")
                .bind(shared)
                .fetch_one(&pool)
                .await?;
        assert!(dataset_left);

        let assignments: Vec<Uuid> =
            sqlx::query_scalar("SELECT project_id FROM project_datasets WHERE dataset_id = $1")
                .bind(shared)
                .fetch_all(&pool)
                .await?;
        assert_eq!(assignments, vec![survivor]);

        assert!(!storage.exists(&result_key).await.unwrap());
        Ok(())
    }

    #[sqlx::test]
    async fn test_delete_missing(pool: PgPool) -> sqlx::Result<()> {
        let (_dir, storage) = local_storage().await;
        let err = handle(pool, storage, DeleteProjectCommand { id: Uuid::new_v4() })
            .await
            .unwrap_err();
        assert!(matches!(err, DeleteProjectError::NotFound(_)));
        Ok(())
    }
}
