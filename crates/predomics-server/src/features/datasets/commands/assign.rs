//! Attach a dataset group to a project

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignDatasetCommand {
    #[serde(skip)]
    pub project_id: Uuid,
    pub dataset_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssignDatasetResponse {
    pub project_id: Uuid,
    pub dataset_id: Uuid,
    /// False when the dataset was already assigned
    pub created: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum AssignDatasetError {
    #[error("Project '{0}' not found")]
    ProjectNotFound(Uuid),

    #[error("Dataset '{0}' not found")]
    DatasetNotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<AssignDatasetResponse, AssignDatasetError>> for AssignDatasetCommand {}

impl crate::cqrs::middleware::Command for AssignDatasetCommand {}

/// Check that both sides of a membership exist
pub(super) async fn check_membership_sides(
    pool: &PgPool,
    project_id: Uuid,
    dataset_id: Uuid,
) -> Result<(bool, bool), sqlx::Error> {
    sqlx::query_as::<_, (bool, bool)>(
        r#"
        SELECT EXISTS(SELECT 1 FROM projects WHERE id = $1),
               EXISTS(SELECT 1 FROM datasets WHERE id = $2)
        "#,
    )
    .bind(project_id)
    .bind(dataset_id)
    .fetch_one(pool)
    .await
}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    command: AssignDatasetCommand,
) -> Result<AssignDatasetResponse, AssignDatasetError> {
    let (project, dataset) = check_membership_sides(&pool, command.project_id, command.dataset_id).await?;
    if !project {
        return Err(AssignDatasetError::ProjectNotFound(command.project_id));
    }
    if !dataset {
        return Err(AssignDatasetError::DatasetNotFound(command.dataset_id));
    }

    let result = sqlx::query(
        "INSERT INTO project_datasets (project_id, dataset_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(command.project_id)
    .bind(command.dataset_id)
    .execute(&pool)
    .await
    .map_err(|e| {
        // a concurrent delete of either side
        if crate::features::shared::error_helpers::is_foreign_key_violation(&e) {
            AssignDatasetError::DatasetNotFound(command.dataset_id)
        } else {
            AssignDatasetError::Database(e)
        }
    })?;

    let created = result.rows_affected() == 1;
    if created {
        tracing::info!(project_id = %command.project_id, dataset_id = %command.dataset_id, "Dataset assigned");
    }

    Ok(AssignDatasetResponse {
        project_id: command.project_id,
        dataset_id: command.dataset_id,
        created,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{TestDataset, TestProject};

    #[sqlx::test]
    async fn test_assign_is_idempotent(pool: PgPool) -> sqlx::Result<()> {
        let project = TestProject::new("p").insert(&pool).await?;
        let dataset = TestDataset::new("d").insert(&pool).await?;
        let command = AssignDatasetCommand {
            project_id: project,
            dataset_id: dataset,
        };

        let first = handle(pool.clone(), command.clone()).await.unwrap();
        let second = handle(pool.clone(), command).await.unwrap();
        assert!(first.created);
        assert!(!second.created);

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM project_datasets")
            .fetch_one(&pool)
            .await?;
        assert_eq!(rows, 1);
        Ok(())
    }

    #[sqlx::test]
    async fn test_assign_missing_sides(pool: PgPool) -> sqlx::Result<()> {
        let project = TestProject::new("p").insert(&pool).await?;
        let dataset = TestDataset::new("d").insert(&pool).await?;

        let err = handle(
            pool.clone(),
            AssignDatasetCommand {
                project_id: Uuid::new_v4(),
                dataset_id: dataset,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AssignDatasetError::ProjectNotFound(_)));

        let err = handle(
            pool,
            AssignDatasetCommand {
                project_id: project,
                dataset_id: Uuid::new_v4(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AssignDatasetError::DatasetNotFound(_)));
        Ok(())
    }
}
