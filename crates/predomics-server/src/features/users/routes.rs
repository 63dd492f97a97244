//! User routes
//!
//! - `POST /api/users` - Create a user
//! - `GET /api/users` - List users
//! - `GET /api/users/:id` - Get a user

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    commands::{CreateUserCommand, CreateUserError},
    queries::{GetUserError, GetUserQuery, ListUsersError, ListUsersQuery},
};
use crate::api::response::{error_response, internal_error, ApiResponse};

pub fn users_routes() -> Router<PgPool> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user))
}

#[tracing::instrument(skip(pool, command), fields(email = %command.email))]
async fn create_user(
    State(pool): State<PgPool>,
    Json(command): Json<CreateUserCommand>,
) -> Result<Response, UserApiError> {
    let user = super::commands::create::handle(pool, command).await?;
    Ok(ApiResponse::created(user).into_response())
}

#[tracing::instrument(skip(pool))]
async fn get_user(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<Response, UserApiError> {
    let user = super::queries::get::handle(pool, GetUserQuery { id }).await?;
    Ok(ApiResponse::success(user).into_response())
}

#[tracing::instrument(skip(pool, query))]
async fn list_users(
    State(pool): State<PgPool>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Response, UserApiError> {
    let page = super::queries::list::handle(pool, query).await?;
    let meta = json!({ "pagination": page.pagination });
    Ok(ApiResponse::success_with_meta(page.items, meta).into_response())
}

#[derive(Debug)]
enum UserApiError {
    Create(CreateUserError),
    Get(GetUserError),
    List(ListUsersError),
}

impl From<CreateUserError> for UserApiError {
    fn from(err: CreateUserError) -> Self {
        Self::Create(err)
    }
}

impl From<GetUserError> for UserApiError {
    fn from(err: GetUserError) -> Self {
        Self::Get(err)
    }
}

impl From<ListUsersError> for UserApiError {
    fn from(err: ListUsersError) -> Self {
        Self::List(err)
    }
}

impl IntoResponse for UserApiError {
    fn into_response(self) -> Response {
        match self {
            UserApiError::Create(
                e @ (CreateUserError::InvalidEmail(_) | CreateUserError::PasswordTooShort),
            ) => error_response(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", e.to_string()),
            UserApiError::Create(e @ CreateUserError::DuplicateEmail(_)) => {
                error_response(StatusCode::CONFLICT, "CONFLICT", e.to_string())
            },
            UserApiError::Get(e @ GetUserError::NotFound(_)) => {
                error_response(StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
            },
            UserApiError::List(e @ ListUsersError::InvalidPagination(_)) => {
                error_response(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", e.to_string())
            },
            UserApiError::Create(e @ (CreateUserError::Hash(_) | CreateUserError::Database(_))) => {
                tracing::error!("User creation failed: {}", e);
                internal_error()
            },
            UserApiError::Get(GetUserError::Database(e)) | UserApiError::List(ListUsersError::Database(e)) => {
                tracing::error!("Database error in user query: {}", e);
                internal_error()
            },
        }
    }
}
