use chrono::{Duration, Utc};
use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::shares::types::{generate_token, Share, SharePermission, SHARE_COLUMNS};
use crate::features::users::queries::get::exists as user_exists;

/// Ten years; keeps the expiry inside chrono's range
pub const MAX_EXPIRES_IN_DAYS: i64 = 3650;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateShareCommand {
    #[serde(skip)]
    pub project_id: Uuid,
    #[serde(default)]
    pub permission: SharePermission,
    #[serde(default)]
    pub expires_in_days: Option<i64>,
    #[serde(skip)]
    pub created_by: Option<Uuid>,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateShareError {
    #[error("expires_in_days must be between 1 and {MAX_EXPIRES_IN_DAYS}, got {0}")]
    InvalidExpiry(i64),

    #[error("Project '{0}' not found")]
    ProjectNotFound(Uuid),

    #[error("User '{0}' not found")]
    UserNotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<Share, CreateShareError>> for CreateShareCommand {}

impl crate::cqrs::middleware::Command for CreateShareCommand {}

impl CreateShareCommand {
    pub fn validate(&self) -> Result<(), CreateShareError> {
        match self.expires_in_days {
            Some(days) if !(1..=MAX_EXPIRES_IN_DAYS).contains(&days) => {
                Err(CreateShareError::InvalidExpiry(days))
            },
            _ => Ok(()),
        }
    }
}

#[tracing::instrument(skip(pool))]
pub async fn handle(pool: PgPool, command: CreateShareCommand) -> Result<Share, CreateShareError> {
    command.validate()?;

    let project_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM projects WHERE id = $1)")
        .bind(command.project_id)
        .fetch_one(&pool)
        .await?;
    if !project_exists {
        return Err(CreateShareError::ProjectNotFound(command.project_id));
    }

    if let Some(user) = command.created_by {
        if !user_exists(&pool, user).await? {
            return Err(CreateShareError::UserNotFound(user));
        }
    }

    let expires_at = command.expires_in_days.map(|days| Utc::now() + Duration::days(days));

    let share = sqlx::query_as::<_, Share>(&format!(
        r#"
        INSERT INTO shares (project_id, token, permission, created_by, expires_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {}
        "#,
        SHARE_COLUMNS
    ))
    .bind(command.project_id)
    .bind(generate_token())
    .bind(command.permission.as_str())
    .bind(command.created_by)
    .bind(expires_at)
    .fetch_one(&pool)
    .await?;

    tracing::info!(share_id = %share.id, permission = %share.permission, "Share created");
    Ok(share)
}
