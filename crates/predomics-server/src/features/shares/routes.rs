//! Share routes
//!
//! - `POST /api/projects/:id/shares` - Create a share link
//! - `GET /api/projects/:id/shares` - List a project's shares
//! - `DELETE /api/shares/:token` - Revoke a share
//! - `GET /api/public/:token` - Read-only project view for a share token

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    commands::{CreateShareCommand, CreateShareError, RevokeShareCommand, RevokeShareError},
    queries::{ListSharesError, ListSharesQuery, ResolveShareError, ResolveShareQuery},
};
use crate::api::response::{error_response, internal_error, ApiResponse};
use crate::middleware::ActingUser;

/// Share management mounted below a project
pub fn project_share_routes() -> Router<PgPool> {
    Router::new().route("/:id/shares", get(list_shares).post(create_share))
}

pub fn shares_routes() -> Router<PgPool> {
    Router::new().route("/:token", delete(revoke_share))
}

pub fn public_routes() -> Router<PgPool> {
    Router::new().route("/:token", get(resolve_share))
}

#[tracing::instrument(skip(pool, command))]
async fn create_share(
    State(pool): State<PgPool>,
    Path(project_id): Path<Uuid>,
    ActingUser(user): ActingUser,
    command: Option<Json<CreateShareCommand>>,
) -> Result<Response, ShareApiError> {
    let mut command = command.map(|Json(c)| c).unwrap_or_default();
    command.project_id = project_id;
    command.created_by = user;
    let share = super::commands::create::handle(pool, command).await?;
    Ok(ApiResponse::created(share).into_response())
}

#[tracing::instrument(skip(pool))]
async fn list_shares(
    State(pool): State<PgPool>,
    Path(project_id): Path<Uuid>,
) -> Result<Response, ShareApiError> {
    let shares = super::queries::list::handle(pool, ListSharesQuery { project_id }).await?;
    Ok(ApiResponse::success(shares).into_response())
}

#[tracing::instrument(skip_all)]
async fn revoke_share(
    State(pool): State<PgPool>,
    Path(token): Path<String>,
) -> Result<Response, ShareApiError> {
    let revoked = super::commands::revoke::handle(pool, RevokeShareCommand { token }).await?;
    Ok(ApiResponse::success(revoked).into_response())
}

#[tracing::instrument(skip_all)]
async fn resolve_share(
    State(pool): State<PgPool>,
    Path(token): Path<String>,
) -> Result<Response, ShareApiError> {
    let shared = super::queries::resolve::handle(pool, ResolveShareQuery { token }).await?;
    Ok(ApiResponse::success(shared).into_response())
}

#[derive(Debug)]
enum ShareApiError {
    Create(CreateShareError),
    List(ListSharesError),
    Revoke(RevokeShareError),
    Resolve(ResolveShareError),
}

impl From<CreateShareError> for ShareApiError {
    fn from(err: CreateShareError) -> Self {
        Self::Create(err)
    }
}

impl From<ListSharesError> for ShareApiError {
    fn from(err: ListSharesError) -> Self {
        Self::List(err)
    }
}

impl From<RevokeShareError> for ShareApiError {
    fn from(err: RevokeShareError) -> Self {
        Self::Revoke(err)
    }
}

impl From<ResolveShareError> for ShareApiError {
    fn from(err: ResolveShareError) -> Self {
        Self::Resolve(err)
    }
}

impl IntoResponse for ShareApiError {
    fn into_response(self) -> Response {
        match self {
            ShareApiError::Create(e @ CreateShareError::InvalidExpiry(_)) => {
                error_response(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", e.to_string())
            },
            ShareApiError::Create(
                e @ (CreateShareError::ProjectNotFound(_) | CreateShareError::UserNotFound(_)),
            ) => error_response(StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string()),
            ShareApiError::List(e @ ListSharesError::ProjectNotFound(_)) => {
                error_response(StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
            },
            ShareApiError::Revoke(e @ RevokeShareError::NotFound) => {
                error_response(StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
            },
            ShareApiError::Resolve(e @ ResolveShareError::NotFound) => {
                error_response(StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
            },
            ShareApiError::Create(CreateShareError::Database(e))
            | ShareApiError::List(ListSharesError::Database(e))
            | ShareApiError::Revoke(RevokeShareError::Database(e))
            | ShareApiError::Resolve(ResolveShareError::Database(e)) => {
                tracing::error!("Database error in share operation: {}", e);
                internal_error()
            },
        }
    }
}
