//! Rename or re-describe a dataset group

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::datasets::types::{Dataset, DATASET_COLUMNS};
use crate::features::shared::validation::{validate_description, validate_name, NameValidationError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDatasetCommand {
    #[serde(skip)]
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum UpdateDatasetError {
    #[error("At least one field must be provided")]
    NoFieldsToUpdate,

    #[error("Name validation failed: {0}")]
    NameValidation(#[from] NameValidationError),

    #[error("{0}")]
    DescriptionValidation(String),

    #[error("Dataset '{0}' not found")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<Dataset, UpdateDatasetError>> for UpdateDatasetCommand {}

impl crate::cqrs::middleware::Command for UpdateDatasetCommand {}

impl UpdateDatasetCommand {
    pub fn validate(&self) -> Result<(), UpdateDatasetError> {
        if self.name.is_none() && self.description.is_none() {
            return Err(UpdateDatasetError::NoFieldsToUpdate);
        }
        if let Some(ref name) = self.name {
            validate_name(name, 256)?;
        }
        validate_description(self.description.as_deref())
            .map_err(UpdateDatasetError::DescriptionValidation)?;
        Ok(())
    }
}

#[tracing::instrument(skip(pool, command), fields(dataset_id = %command.id))]
pub async fn handle(pool: PgPool, command: UpdateDatasetCommand) -> Result<Dataset, UpdateDatasetError> {
    command.validate()?;

    sqlx::query_as::<_, Dataset>(&format!(
        r#"
        UPDATE datasets
        SET name = COALESCE($2, name),
            description = COALESCE($3, description),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        DATASET_COLUMNS
    ))
    .bind(command.id)
    .bind(command.name.as_deref().map(str::trim))
    .bind(&command.description)
    .fetch_optional(&pool)
    .await?
    .ok_or(UpdateDatasetError::NotFound(command.id))
}
