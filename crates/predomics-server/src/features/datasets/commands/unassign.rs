//! Detach a dataset group from a project. The dataset itself is kept.

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::assign::check_membership_sides;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnassignDatasetCommand {
    pub project_id: Uuid,
    pub dataset_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnassignDatasetResponse {
    pub project_id: Uuid,
    pub dataset_id: Uuid,
    /// False when the dataset was not assigned
    pub removed: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum UnassignDatasetError {
    #[error("Project '{0}' not found")]
    ProjectNotFound(Uuid),

    #[error("Dataset '{0}' not found")]
    DatasetNotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<UnassignDatasetResponse, UnassignDatasetError>> for UnassignDatasetCommand {}

impl crate::cqrs::middleware::Command for UnassignDatasetCommand {}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    command: UnassignDatasetCommand,
) -> Result<UnassignDatasetResponse, UnassignDatasetError> {
    let (project, dataset) = check_membership_sides(&pool, command.project_id, command.dataset_id).await?;
    if !project {
        return Err(UnassignDatasetError::ProjectNotFound(command.project_id));
    }
    if !dataset {
        return Err(UnassignDatasetError::DatasetNotFound(command.dataset_id));
    }

    let result = sqlx::query("DELETE FROM project_datasets WHERE project_id = $1 AND dataset_id = $2")
        .bind(command.project_id)
        .bind(command.dataset_id)
        .execute(&pool)
        .await?;

    let removed = result.rows_affected() == 1;
    if removed {
        tracing::info!(project_id = %command.project_id, dataset_id = %command.dataset_id, "Dataset unassigned");
    }

    Ok(UnassignDatasetResponse {
        project_id: command.project_id,
        dataset_id: command.dataset_id,
        removed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{TestDataset, TestProject};

    #[sqlx::test]
    async fn test_unassign_keeps_dataset(pool: PgPool) -> sqlx::Result<()> {
        let project = TestProject::new("p").insert(&pool).await?;
        let dataset = TestDataset::new("d").insert(&pool).await?;
        TestProject::assign(&pool, project, dataset).await?;
        let command = UnassignDatasetCommand {
            project_id: project,
            dataset_id: dataset,
        };

        assert!(handle(pool.clone(), command.clone()).await.unwrap().removed);
        assert!(!handle(pool.clone(), command).await.unwrap().removed);

        let kept: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM datasets WHERE id = $1)")
            .bind(dataset)
            .fetch_one(&pool)
            .await?;
        assert!(kept);
        Ok(())
    }

    #[sqlx::test]
    async fn test_unassign_unknown_project(pool: PgPool) -> sqlx::Result<()> {
        let dataset = TestDataset::new("d").insert(&pool).await?;
        let err = handle(
            pool,
            UnassignDatasetCommand {
                project_id: Uuid::new_v4(),
                dataset_id: dataset,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, UnassignDatasetError::ProjectNotFound(_)));
        Ok(())
    }
}
