//! Delete a dataset group, its files and its project assignments

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::storage::Storage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteDatasetCommand {
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeleteDatasetResponse {
    pub id: Uuid,
    pub files_removed: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteDatasetError {
    #[error("Dataset '{0}' not found")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<DeleteDatasetResponse, DeleteDatasetError>> for DeleteDatasetCommand {}

impl crate::cqrs::middleware::Command for DeleteDatasetCommand {}

#[tracing::instrument(skip(pool, storage))]
pub async fn handle(
    pool: PgPool,
    storage: Storage,
    command: DeleteDatasetCommand,
) -> Result<DeleteDatasetResponse, DeleteDatasetError> {
    let mut tx = pool.begin().await?;

    let keys: Vec<String> =
        sqlx::query_scalar("SELECT storage_key FROM dataset_files WHERE dataset_id = $1")
            .bind(command.id)
            .fetch_all(&mut *tx)
            .await?;

    let deleted = sqlx::query("DELETE FROM datasets WHERE id = $1")
        .bind(command.id)
        .execute(&mut *tx)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(DeleteDatasetError::NotFound(command.id));
    }

    tx.commit().await?;

    storage.delete_best_effort(&keys).await;
    tracing::info!(dataset_id = %command.id, files = keys.len(), "Dataset deleted");

    Ok(DeleteDatasetResponse {
        id: command.id,
        files_removed: keys.len(),
    })
}
