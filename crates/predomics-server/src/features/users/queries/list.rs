use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::features::shared::{Paginated, PaginationParams};
use crate::features::users::types::User;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListUsersQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListUsersError {
    #[error("{0}")]
    InvalidPagination(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<Paginated<User>, ListUsersError>> for ListUsersQuery {}

impl crate::cqrs::middleware::Query for ListUsersQuery {}

#[tracing::instrument(skip(pool))]
pub async fn handle(pool: PgPool, query: ListUsersQuery) -> Result<Paginated<User>, ListUsersError> {
    let params = PaginationParams::new(query.page, query.per_page);
    params.validate().map_err(ListUsersError::InvalidPagination)?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await?;

    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, is_admin, created_at
        FROM users
        ORDER BY created_at ASC, email ASC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(params.per_page())
    .bind(params.offset())
    .fetch_all(&pool)
    .await?;

    Ok(Paginated::from_items(users, &params, total))
}
