use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::projects::types::{fetch_project_detail, ProjectDetail};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetProjectQuery {
    pub id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum GetProjectError {
    #[error("Project '{0}' not found")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<ProjectDetail, GetProjectError>> for GetProjectQuery {}

impl crate::cqrs::middleware::Query for GetProjectQuery {}

#[tracing::instrument(skip(pool))]
pub async fn handle(pool: PgPool, query: GetProjectQuery) -> Result<ProjectDetail, GetProjectError> {
    fetch_project_detail(&pool, query.id)
        .await?
        .ok_or(GetProjectError::NotFound(query.id))
}
