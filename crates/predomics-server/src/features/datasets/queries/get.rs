use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::datasets::types::{fetch_files, Dataset, DatasetFile, DATASET_COLUMNS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetDatasetQuery {
    pub id: Uuid,
}

/// A dataset with its files and the projects it is assigned to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetDetail {
    #[serde(flatten)]
    pub dataset: Dataset,
    pub files: Vec<DatasetFile>,
    pub project_ids: Vec<Uuid>,
}

#[derive(Debug, thiserror::Error)]
pub enum GetDatasetError {
    #[error("Dataset '{0}' not found")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<DatasetDetail, GetDatasetError>> for GetDatasetQuery {}

impl crate::cqrs::middleware::Query for GetDatasetQuery {}

#[tracing::instrument(skip(pool))]
pub async fn handle(pool: PgPool, query: GetDatasetQuery) -> Result<DatasetDetail, GetDatasetError> {
    let dataset = sqlx::query_as::<_, Dataset>(&format!(
        "SELECT {} FROM datasets WHERE id = $1",
        DATASET_COLUMNS
    ))
    .bind(query.id)
    .fetch_optional(&pool)
    .await?
    .ok_or(GetDatasetError::NotFound(query.id))?;

    let files = fetch_files(&pool, &[dataset.id]).await?;

    let project_ids: Vec<Uuid> = sqlx::query_scalar(
        "SELECT project_id FROM project_datasets WHERE dataset_id = $1 ORDER BY assigned_at ASC",
    )
    .bind(dataset.id)
    .fetch_all(&pool)
    .await?;

    Ok(DatasetDetail {
        dataset,
        files,
        project_ids,
    })
}
