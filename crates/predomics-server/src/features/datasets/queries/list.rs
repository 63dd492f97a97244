use chrono::{DateTime, Utc};
use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::shared::{like_pattern, Paginated, PaginationParams};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListDatasetsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Uuid>,
    /// Only datasets assigned to this project
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_contains: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct DatasetSummary {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Option<Uuid>,
    pub file_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListDatasetsError {
    #[error("{0}")]
    InvalidPagination(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<Paginated<DatasetSummary>, ListDatasetsError>> for ListDatasetsQuery {}

impl crate::cqrs::middleware::Query for ListDatasetsQuery {}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    query: ListDatasetsQuery,
) -> Result<Paginated<DatasetSummary>, ListDatasetsError> {
    let params = PaginationParams::new(query.page, query.per_page);
    params.validate().map_err(ListDatasetsError::InvalidPagination)?;

    let pattern = like_pattern(query.name_contains.as_deref());

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM datasets d
        WHERE ($1::UUID IS NULL OR d.owner_id = $1)
          AND ($2::UUID IS NULL OR EXISTS(
                SELECT 1 FROM project_datasets pd WHERE pd.dataset_id = d.id AND pd.project_id = $2))
          AND ($3::TEXT IS NULL OR d.name ILIKE $3)
        "#,
    )
    .bind(query.owner_id)
    .bind(query.project_id)
    .bind(&pattern)
    .fetch_one(&pool)
    .await?;

    let items = sqlx::query_as::<_, DatasetSummary>(
        r#"
        SELECT d.id, d.name, d.description, d.owner_id,
               (SELECT COUNT(*) FROM dataset_files f WHERE f.dataset_id = d.id) AS file_count,
               d.created_at, d.updated_at
        FROM datasets d
        WHERE ($1::UUID IS NULL OR d.owner_id = $1)
          AND ($2::UUID IS NULL OR EXISTS(
                SELECT 1 FROM project_datasets pd WHERE pd.dataset_id = d.id AND pd.project_id = $2))
          AND ($3::TEXT IS NULL OR d.name ILIKE $3)
        ORDER BY d.created_at DESC, d.name ASC
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(query.owner_id)
    .bind(query.project_id)
    .bind(&pattern)
    .bind(params.per_page())
    .bind(params.offset())
    .fetch_all(&pool)
    .await?;

    Ok(Paginated::from_items(items, &params, total))
}
