//! Remove a single file from a dataset

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::storage::Storage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteFileCommand {
    pub dataset_id: Uuid,
    pub file_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeleteFileResponse {
    pub id: Uuid,
    pub dataset_id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteFileError {
    #[error("File '{file_id}' not found in dataset '{dataset_id}'")]
    NotFound { dataset_id: Uuid, file_id: Uuid },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<DeleteFileResponse, DeleteFileError>> for DeleteFileCommand {}

impl crate::cqrs::middleware::Command for DeleteFileCommand {}

#[tracing::instrument(skip(pool, storage))]
pub async fn handle(
    pool: PgPool,
    storage: Storage,
    command: DeleteFileCommand,
) -> Result<DeleteFileResponse, DeleteFileError> {
    let mut tx = pool.begin().await?;

    let storage_key: String = sqlx::query_scalar(
        "DELETE FROM dataset_files WHERE id = $1 AND dataset_id = $2 RETURNING storage_key",
    )
    .bind(command.file_id)
    .bind(command.dataset_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(DeleteFileError::NotFound {
        dataset_id: command.dataset_id,
        file_id: command.file_id,
    })?;

    sqlx::query("UPDATE datasets SET updated_at = NOW() WHERE id = $1")
        .bind(command.dataset_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    storage.delete_best_effort([storage_key]).await;
    tracing::info!(file_id = %command.file_id, "File deleted");

    Ok(DeleteFileResponse {
        id: command.file_id,
        dataset_id: command.dataset_id,
    })
}
