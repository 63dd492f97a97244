use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::projects::types::{Project, PROJECT_COLUMNS};
use crate::features::shared::validation::{
    validate_class_names, validate_description, validate_name, NameValidationError,
};
use crate::features::users::queries::get::exists as user_exists;

pub const MAX_PROJECT_NAME_LENGTH: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectCommand {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub class_names: Vec<String>,
    #[serde(skip)]
    pub owner_id: Option<Uuid>,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateProjectError {
    #[error("Name validation failed: {0}")]
    NameValidation(#[from] NameValidationError),

    #[error("{0}")]
    DescriptionValidation(String),

    #[error("{0}")]
    ClassNamesValidation(String),

    #[error("Owner '{0}' not found")]
    OwnerNotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<Project, CreateProjectError>> for CreateProjectCommand {}

impl crate::cqrs::middleware::Command for CreateProjectCommand {}

impl CreateProjectCommand {
    pub fn validate(&self) -> Result<(), CreateProjectError> {
        validate_name(&self.name, MAX_PROJECT_NAME_LENGTH)?;
        validate_description(self.description.as_deref())
            .map_err(CreateProjectError::DescriptionValidation)?;
        validate_class_names(&self.class_names).map_err(CreateProjectError::ClassNamesValidation)?;
        Ok(())
    }
}

#[tracing::instrument(skip(pool, command), fields(name = %command.name))]
pub async fn handle(pool: PgPool, command: CreateProjectCommand) -> Result<Project, CreateProjectError> {
    command.validate()?;

    if let Some(owner) = command.owner_id {
        if !user_exists(&pool, owner).await? {
            return Err(CreateProjectError::OwnerNotFound(owner));
        }
    }

    let class_names: Vec<&str> = command.class_names.iter().map(|c| c.trim()).collect();

    let project = sqlx::query_as::<_, Project>(&format!(
        r#"
        INSERT INTO projects (name, description, owner_id, class_names)
        VALUES ($1, $2, $3, $4)
        RETURNING {}
        "#,
        PROJECT_COLUMNS
    ))
    .bind(command.name.trim())
    .bind(&command.description)
    .bind(command.owner_id)
    .bind(&class_names)
    .fetch_one(&pool)
    .await?;

    tracing::info!(project_id = %project.id, "Project created");
    Ok(project)
}
