//! Create an empty dataset group

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::datasets::types::{Dataset, DATASET_COLUMNS};
use crate::features::shared::validation::{validate_description, validate_name, NameValidationError};
use crate::features::users::queries::get::exists as user_exists;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDatasetCommand {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Taken from the `x-user-id` header
    #[serde(skip)]
    pub owner_id: Option<Uuid>,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateDatasetError {
    #[error("Name validation failed: {0}")]
    NameValidation(#[from] NameValidationError),

    #[error("{0}")]
    DescriptionValidation(String),

    #[error("Owner '{0}' not found")]
    OwnerNotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<Dataset, CreateDatasetError>> for CreateDatasetCommand {}

impl crate::cqrs::middleware::Command for CreateDatasetCommand {}

impl CreateDatasetCommand {
    pub fn validate(&self) -> Result<(), CreateDatasetError> {
        validate_name(&self.name, 256)?;
        validate_description(self.description.as_deref())
            .map_err(CreateDatasetError::DescriptionValidation)?;
        Ok(())
    }
}

#[tracing::instrument(skip(pool, command), fields(name = %command.name))]
pub async fn handle(pool: PgPool, command: CreateDatasetCommand) -> Result<Dataset, CreateDatasetError> {
    command.validate()?;

    if let Some(owner) = command.owner_id {
        if !user_exists(&pool, owner).await? {
            return Err(CreateDatasetError::OwnerNotFound(owner));
        }
    }

    let dataset = sqlx::query_as::<_, Dataset>(&format!(
        "INSERT INTO datasets (name, description, owner_id) VALUES ($1, $2, $3) RETURNING {}",
        DATASET_COLUMNS
    ))
    .bind(command.name.trim())
    .bind(&command.description)
    .bind(command.owner_id)
    .fetch_one(&pool)
    .await?;

    tracing::info!(dataset_id = %dataset.id, "Dataset created");
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::TestUser;

    #[sqlx::test]
    async fn test_create_dataset(pool: PgPool) -> sqlx::Result<()> {
        let owner = TestUser::new("owner@lab.example").insert(&pool).await?;
        let dataset = handle(
            pool.clone(),
            CreateDatasetCommand {
                name: "  Crohn cohort ".to_string(),
                description: Some("stool metagenomes".to_string()),
                owner_id: Some(owner),
            },
        )
        .await
        .unwrap();

        assert_eq!(dataset.name, "Crohn cohort");
        assert_eq!(dataset.owner_id, Some(owner));
        Ok(())
    }

    #[sqlx::test]
    async fn test_unknown_owner(pool: PgPool) -> sqlx::Result<()> {
        let err = handle(
            pool,
            CreateDatasetCommand {
                name: "x".to_string(),
                description: None,
                owner_id: Some(Uuid::new_v4()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CreateDatasetError::OwnerNotFound(_)));
        Ok(())
    }

    #[test]
    fn test_blank_name_rejected() {
        let command = CreateDatasetCommand {
            name: " ".to_string(),
            description: None,
            owner_id: None,
        };
        assert!(matches!(command.validate(), Err(CreateDatasetError::NameValidation(_))));
    }
}
