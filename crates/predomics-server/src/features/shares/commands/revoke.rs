use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokeShareCommand {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RevokeShareResponse {
    pub id: Uuid,
    pub project_id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum RevokeShareError {
    #[error("Share not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<RevokeShareResponse, RevokeShareError>> for RevokeShareCommand {}

impl crate::cqrs::middleware::Command for RevokeShareCommand {}

// the token is a credential; keep it out of spans
#[tracing::instrument(skip(pool, command))]
pub async fn handle(pool: PgPool, command: RevokeShareCommand) -> Result<RevokeShareResponse, RevokeShareError> {
    let revoked: Option<(Uuid, Uuid)> =
        sqlx::query_as("DELETE FROM shares WHERE token = $1 RETURNING id, project_id")
            .bind(&command.token)
            .fetch_optional(&pool)
            .await?;

    let (id, project_id) = revoked.ok_or(RevokeShareError::NotFound)?;
    tracing::info!(share_id = %id, "Share revoked");
    Ok(RevokeShareResponse { id, project_id })
}
