use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::users::types::User;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetUserQuery {
    pub id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum GetUserError {
    #[error("User '{0}' not found")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<User, GetUserError>> for GetUserQuery {}

impl crate::cqrs::middleware::Query for GetUserQuery {}

#[tracing::instrument(skip(pool))]
pub async fn handle(pool: PgPool, query: GetUserQuery) -> Result<User, GetUserError> {
    sqlx::query_as::<_, User>("SELECT id, email, is_admin, created_at FROM users WHERE id = $1")
        .bind(query.id)
        .fetch_optional(&pool)
        .await?
        .ok_or(GetUserError::NotFound(query.id))
}

/// Shared existence check used by commands that take an owner
pub async fn exists(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::TestUser;

    #[sqlx::test]
    async fn test_get_user(pool: PgPool) -> sqlx::Result<()> {
        let id = TestUser::new("bo@lab.example").insert(&pool).await?;
        let user = handle(pool.clone(), GetUserQuery { id }).await.unwrap();
        assert_eq!(user.email, "bo@lab.example");
        assert!(exists(&pool, id).await?);
        Ok(())
    }

    #[sqlx::test]
    async fn test_get_missing_user(pool: PgPool) -> sqlx::Result<()> {
        let err = handle(pool.clone(), GetUserQuery { id: Uuid::new_v4() })
            .await
            .unwrap_err();
        assert!(matches!(err, GetUserError::NotFound(_)));
        Ok(())
    }
}
