use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::create::MAX_PROJECT_NAME_LENGTH;
use crate::features::projects::types::{Project, PROJECT_COLUMNS};
use crate::features::shared::validation::{
    validate_class_names, validate_description, validate_name, NameValidationError,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProjectCommand {
    #[serde(skip)]
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub class_names: Option<Vec<String>>,
    #[serde(default)]
    pub archived: Option<bool>,
}

#[derive(Debug, thiserror::Error)]
pub enum UpdateProjectError {
    #[error("At least one field must be provided")]
    NoFieldsToUpdate,

    #[error("Name validation failed: {0}")]
    NameValidation(#[from] NameValidationError),

    #[error("{0}")]
    DescriptionValidation(String),

    #[error("{0}")]
    ClassNamesValidation(String),

    #[error("Project '{0}' not found")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<Project, UpdateProjectError>> for UpdateProjectCommand {}

impl crate::cqrs::middleware::Command for UpdateProjectCommand {}

impl UpdateProjectCommand {
    pub fn validate(&self) -> Result<(), UpdateProjectError> {
        if self.name.is_none()
            && self.description.is_none()
            && self.class_names.is_none()
            && self.archived.is_none()
        {
            return Err(UpdateProjectError::NoFieldsToUpdate);
        }
        if let Some(ref name) = self.name {
            validate_name(name, MAX_PROJECT_NAME_LENGTH)?;
        }
        validate_description(self.description.as_deref())
            .map_err(UpdateProjectError::DescriptionValidation)?;
        if let Some(ref class_names) = self.class_names {
            validate_class_names(class_names).map_err(UpdateProjectError::ClassNamesValidation)?;
        }
        Ok(())
    }
}

#[tracing::instrument(skip(pool, command), fields(project_id = %command.id))]
pub async fn handle(pool: PgPool, command: UpdateProjectCommand) -> Result<Project, UpdateProjectError> {
    command.validate()?;

    let class_names: Option<Vec<String>> = command
        .class_names
        .map(|names| names.iter().map(|c| c.trim().to_string()).collect());

    let project = sqlx::query_as::<_, Project>(&format!(
        r#"
        UPDATE projects
        SET name = COALESCE($2, name),
            description = COALESCE($3, description),
            class_names = COALESCE($4, class_names),
            archived = COALESCE($5, archived),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        PROJECT_COLUMNS
    ))
    .bind(command.id)
    .bind(command.name.as_deref().map(str::trim))
    .bind(&command.description)
    .bind(&class_names)
    .bind(command.archived)
    .fetch_optional(&pool)
    .await?
    .ok_or(UpdateProjectError::NotFound(command.id))?;

    tracing::info!(project_id = %project.id, archived = project.archived, "Project updated");
    Ok(project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::TestProject;

    #[sqlx::test]
    async fn test_update_bumps_updated_at(pool: PgPool) -> sqlx::Result<()> {
        let id = TestProject::new("before").insert(&pool).await?;
        let before: chrono::DateTime<chrono::Utc> =
            sqlx::query_scalar("SELECT updated_at FROM projects WHERE id = $1")
                .bind(id)
                .fetch_one(&pool)
                .await?;

        let project = handle(
            pool,
            UpdateProjectCommand {
                id,
                name: Some("after".to_string()),
                archived: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(project.name, "after");
        assert!(project.archived);
        assert_eq!(project.class_names, vec!["healthy", "sick"]);
        assert!(project.updated_at >= before);
        Ok(())
    }

    #[sqlx::test]
    async fn test_update_missing(pool: PgPool) -> sqlx::Result<()> {
        let err = handle(
            pool,
            UpdateProjectCommand {
                id: Uuid::new_v4(),
                archived: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, UpdateProjectError::NotFound(_)));
        Ok(())
    }

    #[test]
    fn test_empty_update_rejected() {
        assert!(matches!(
            UpdateProjectCommand::default().validate(),
            Err(UpdateProjectError::NoFieldsToUpdate)
        ));
    }
}
