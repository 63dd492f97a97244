//! Public, read-only access to a project through a share token

use chrono::Utc;
use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::features::projects::types::{fetch_project_detail, ProjectDetail};
use crate::features::shares::types::{Share, SharePermission, SHARE_COLUMNS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveShareQuery {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SharedProject {
    pub permission: SharePermission,
    pub project: ProjectDetail,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveShareError {
    /// Unknown and expired tokens are indistinguishable to the caller
    #[error("Share not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<SharedProject, ResolveShareError>> for ResolveShareQuery {}

impl crate::cqrs::middleware::Query for ResolveShareQuery {}

#[tracing::instrument(skip(pool, query))]
pub async fn handle(pool: PgPool, query: ResolveShareQuery) -> Result<SharedProject, ResolveShareError> {
    let share = sqlx::query_as::<_, Share>(&format!("SELECT {} FROM shares WHERE token = $1", SHARE_COLUMNS))
        .bind(&query.token)
        .fetch_optional(&pool)
        .await?
        .ok_or(ResolveShareError::NotFound)?;

    if share.is_expired(Utc::now()) {
        tracing::debug!(share_id = %share.id, "Share expired");
        return Err(ResolveShareError::NotFound);
    }

    let project = fetch_project_detail(&pool, share.project_id)
        .await?
        .ok_or(ResolveShareError::NotFound)?;

    Ok(SharedProject {
        permission: share.permission,
        project,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{local_storage, TestDataset, TestFile, TestJob, TestProject};
    use crate::features::shares::commands::create::{self, CreateShareCommand};
    use predomics_common::types::JobStatus;

    #[sqlx::test]
    async fn test_resolve_share(pool: PgPool) -> sqlx::Result<()> {
        let (_dir, storage) = local_storage().await;
        let project = TestProject::new("T2D").insert(&pool).await?;
        let dataset = TestDataset::new("cohort").insert(&pool).await?;
        TestProject::assign(&pool, project, dataset).await?;
        TestFile::matrix(dataset).store(&pool, &storage).await?;
        TestJob::new(project).with_status(JobStatus::Completed).insert(&pool).await?;

        let share = create::handle(
            pool.clone(),
            CreateShareCommand {
                project_id: project,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let shared = handle(pool, ResolveShareQuery { token: share.token }).await.unwrap();
        assert_eq!(shared.permission, SharePermission::Viewer);
        assert_eq!(shared.project.project.id, project);
        assert_eq!(shared.project.datasets.len(), 1);
        assert_eq!(shared.project.jobs.len(), 1);

        let json = serde_json::to_value(&shared).unwrap();
        assert!(json["project"]["datasets"][0]["files"][0].get("storage_key").is_none());
        Ok(())
    }

    #[sqlx::test]
    async fn test_unknown_token(pool: PgPool) -> sqlx::Result<()> {
        let result = handle(pool, ResolveShareQuery { token: "0".repeat(64) }).await;
        assert!(matches!(result, Err(ResolveShareError::NotFound)));
        Ok(())
    }

    #[sqlx::test]
    async fn test_expired_token(pool: PgPool) -> sqlx::Result<()> {
        let project = TestProject::new("T2D").insert(&pool).await?;
        let share = create::handle(
            pool.clone(),
            CreateShareCommand {
                project_id: project,
                expires_in_days: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        sqlx::query("UPDATE shares SET expires_at = NOW() - INTERVAL '1 minute' WHERE id = $1")
            .bind(share.id)
            .execute(&pool)
            .await?;

        let result = handle(pool, ResolveShareQuery { token: share.token }).await;
        assert!(matches!(result, Err(ResolveShareError::NotFound)));
        Ok(())
    }
}
