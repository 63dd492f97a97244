//! Re-tag a file and recompute its statistics from stored content

use mediator::Request;
use predomics_common::types::FileRole;
use predomics_common::CommonError;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::upload::compute_stats;
use crate::features::datasets::types::{DatasetFile, FILE_COLUMNS};
use crate::storage::Storage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetFileRoleCommand {
    #[serde(skip)]
    pub dataset_id: Uuid,
    #[serde(skip)]
    pub file_id: Uuid,
    pub role: FileRole,
}

#[derive(Debug, thiserror::Error)]
pub enum SetFileRoleError {
    #[error("File '{file_id}' not found in dataset '{dataset_id}'")]
    NotFound { dataset_id: Uuid, file_id: Uuid },

    #[error("File content does not fit role: {0}")]
    InvalidContent(#[from] CommonError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<DatasetFile, SetFileRoleError>> for SetFileRoleCommand {}

impl crate::cqrs::middleware::Command for SetFileRoleCommand {}

#[tracing::instrument(skip(pool, storage), fields(role = %command.role))]
pub async fn handle(
    pool: PgPool,
    storage: Storage,
    command: SetFileRoleCommand,
) -> Result<DatasetFile, SetFileRoleError> {
    let not_found = SetFileRoleError::NotFound {
        dataset_id: command.dataset_id,
        file_id: command.file_id,
    };

    let storage_key: String =
        sqlx::query_scalar("SELECT storage_key FROM dataset_files WHERE id = $1 AND dataset_id = $2")
            .bind(command.file_id)
            .bind(command.dataset_id)
            .fetch_optional(&pool)
            .await?
            .ok_or(not_found)?;

    let content = storage
        .download(&storage_key)
        .await
        .map_err(|e| SetFileRoleError::Storage(e.to_string()))?;
    let stats = compute_stats(&content, command.role)?;

    let file = sqlx::query_as::<_, DatasetFile>(&format!(
        r#"
        UPDATE dataset_files
        SET role = $3, n_features = $4, n_samples = $5, class_counts = $6
        WHERE id = $1 AND dataset_id = $2
        RETURNING {}
        "#,
        FILE_COLUMNS
    ))
    .bind(command.file_id)
    .bind(command.dataset_id)
    .bind(command.role.as_str())
    .bind(stats.n_features)
    .bind(stats.n_samples)
    .bind(stats.class_counts.map(Json))
    .fetch_optional(&pool)
    .await?
    .ok_or(SetFileRoleError::NotFound {
        dataset_id: command.dataset_id,
        file_id: command.file_id,
    })?;

    sqlx::query("UPDATE datasets SET updated_at = NOW() WHERE id = $1")
        .bind(command.dataset_id)
        .execute(&pool)
        .await?;

    tracing::info!(file_id = %file.id, "File role updated");
    Ok(file)
}
