use chrono::{DateTime, Utc};
use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::shared::{like_pattern, Paginated, PaginationParams};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListProjectsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Uuid>,
    #[serde(default)]
    pub include_archived: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_contains: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct ProjectSummary {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Option<Uuid>,
    pub archived: bool,
    pub class_names: Vec<String>,
    pub dataset_count: i64,
    pub job_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListProjectsError {
    #[error("{0}")]
    InvalidPagination(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<Paginated<ProjectSummary>, ListProjectsError>> for ListProjectsQuery {}

impl crate::cqrs::middleware::Query for ListProjectsQuery {}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    query: ListProjectsQuery,
) -> Result<Paginated<ProjectSummary>, ListProjectsError> {
    let params = PaginationParams::new(query.page, query.per_page);
    params.validate().map_err(ListProjectsError::InvalidPagination)?;

    let pattern = like_pattern(query.name_contains.as_deref());

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM projects p
        WHERE ($1::UUID IS NULL OR p.owner_id = $1)
          AND ($2 OR NOT p.archived)
          AND ($3::TEXT IS NULL OR p.name ILIKE $3)
        "#,
    )
    .bind(query.owner_id)
    .bind(query.include_archived)
    .bind(&pattern)
    .fetch_one(&pool)
    .await?;

    let items = sqlx::query_as::<_, ProjectSummary>(
        r#"
        SELECT p.id, p.name, p.description, p.owner_id, p.archived, p.class_names,
               (SELECT COUNT(*) FROM project_datasets pd WHERE pd.project_id = p.id) AS dataset_count,
               (SELECT COUNT(*) FROM jobs j WHERE j.project_id = p.id) AS job_count,
               p.created_at, p.updated_at
        FROM projects p
        WHERE ($1::UUID IS NULL OR p.owner_id = $1)
          AND ($2 OR NOT p.archived)
          AND ($3::TEXT IS NULL OR p.name ILIKE $3)
        ORDER BY p.updated_at DESC, p.name ASC
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(query.owner_id)
    .bind(query.include_archived)
    .bind(&pattern)
    .bind(params.per_page())
    .bind(params.offset())
    .fetch_all(&pool)
    .await?;

    Ok(Paginated::from_items(items, &params, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{TestJob, TestProject, TestUser};

    #[sqlx::test]
    async fn test_archived_hidden_by_default(pool: PgPool) -> sqlx::Result<()> {
        let owner = TestUser::new("o@lab.example").insert(&pool).await?;
        let active = TestProject::new("Crohn disease").with_owner(owner).insert(&pool).await?;
        TestProject::new("old crohn").archived().insert(&pool).await?;
        TestProject::new("Obesity").insert(&pool).await?;
        TestJob::new(active).insert(&pool).await?;

        let page = handle(pool.clone(), ListProjectsQuery::default()).await.unwrap();
        assert_eq!(page.pagination.total, 2);

        let crohn = handle(
            pool.clone(),
            ListProjectsQuery {
                include_archived: true,
                name_contains: Some("crohn".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(crohn.pagination.total, 2);

        let mine = handle(
            pool,
            ListProjectsQuery {
                owner_id: Some(owner),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(mine.items.len(), 1);
        assert_eq!(mine.items[0].job_count, 1);
        assert_eq!(mine.items[0].dataset_count, 0);
        Ok(())
    }
}
