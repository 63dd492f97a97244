//! Create user command

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::features::shared::error_helpers::map_unique_violation;
use crate::features::shared::validation::validate_email;
use crate::features::users::password::{hash_password, MIN_PASSWORD_LENGTH};
use crate::features::users::types::User;

#[derive(Clone, Serialize, Deserialize)]
pub struct CreateUserCommand {
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl std::fmt::Debug for CreateUserCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateUserCommand")
            .field("email", &self.email)
            .field("is_admin", &self.is_admin)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CreateUserError {
    #[error("{0}")]
    InvalidEmail(String),

    #[error("Password must be at least {MIN_PASSWORD_LENGTH} characters")]
    PasswordTooShort,

    #[error("A user with email '{0}' already exists")]
    DuplicateEmail(String),

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<User, CreateUserError>> for CreateUserCommand {}

impl crate::cqrs::middleware::Command for CreateUserCommand {}

impl CreateUserCommand {
    pub fn validate(&self) -> Result<(), CreateUserError> {
        validate_email(&self.email).map_err(CreateUserError::InvalidEmail)?;
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(CreateUserError::PasswordTooShort);
        }
        Ok(())
    }
}

#[tracing::instrument(skip(pool, command), fields(email = %command.email))]
pub async fn handle(pool: PgPool, command: CreateUserCommand) -> Result<User, CreateUserError> {
    command.validate()?;

    let email = command.email.trim().to_string();
    let password = command.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| CreateUserError::Hash(e.to_string()))?
        .map_err(|e| CreateUserError::Hash(e.to_string()))?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, password_hash, is_admin)
        VALUES ($1, $2, $3)
        RETURNING id, email, is_admin, created_at
        "#,
    )
    .bind(&email)
    .bind(&password_hash)
    .bind(command.is_admin)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        map_unique_violation(e, CreateUserError::DuplicateEmail(email.clone()), CreateUserError::Database)
    })?;

    tracing::info!(user_id = %user.id, "User created");
    Ok(user)
}
