use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::shares::types::{Share, SHARE_COLUMNS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListSharesQuery {
    pub project_id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum ListSharesError {
    #[error("Project '{0}' not found")]
    ProjectNotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<Vec<Share>, ListSharesError>> for ListSharesQuery {}

impl crate::cqrs::middleware::Query for ListSharesQuery {}

/// All shares of a project, expired ones included, newest first
#[tracing::instrument(skip(pool))]
pub async fn handle(pool: PgPool, query: ListSharesQuery) -> Result<Vec<Share>, ListSharesError> {
    let project_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM projects WHERE id = $1)")
        .bind(query.project_id)
        .fetch_one(&pool)
        .await?;
    if !project_exists {
        return Err(ListSharesError::ProjectNotFound(query.project_id));
    }

    let shares = sqlx::query_as::<_, Share>(&format!(
        "SELECT {} FROM shares WHERE project_id = $1 ORDER BY created_at DESC, id",
        SHARE_COLUMNS
    ))
    .bind(query.project_id)
    .fetch_all(&pool)
    .await?;

    Ok(shares)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::TestProject;
    use crate::features::shares::commands::create::{self, CreateShareCommand};

    #[sqlx::test]
    async fn test_list_only_own_project(pool: PgPool) -> sqlx::Result<()> {
        let project = TestProject::new("T2D").insert(&pool).await?;
        let other = TestProject::new("IBD").insert(&pool).await?;

        for project_id in [project, project, other] {
            create::handle(
                pool.clone(),
                CreateShareCommand {
                    project_id,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        }

        let shares = handle(pool.clone(), ListSharesQuery { project_id: project }).await.unwrap();
        assert_eq!(shares.len(), 2);
        assert!(shares.iter().all(|s| s.project_id == project));

        let missing = handle(pool, ListSharesQuery { project_id: Uuid::new_v4() }).await;
        assert!(matches!(missing, Err(ListSharesError::ProjectNotFound(_))));
        Ok(())
    }
}
