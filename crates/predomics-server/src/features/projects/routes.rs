//! Project routes
//!
//! - `POST /api/projects` - Create a project (owner from `x-user-id`)
//! - `GET /api/projects` - List projects
//! - `GET /api/projects/:id` - Project with datasets and jobs
//! - `PUT /api/projects/:id` - Update a project
//! - `DELETE /api/projects/:id` - Delete a project

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use super::{
    commands::{
        CreateProjectCommand, CreateProjectError, DeleteProjectCommand, DeleteProjectError,
        UpdateProjectCommand, UpdateProjectError,
    },
    queries::{GetProjectError, GetProjectQuery, ListProjectsError, ListProjectsQuery},
};
use crate::api::response::{error_response, internal_error, ApiResponse};
use crate::features::FeatureState;
use crate::middleware::ActingUser;

pub fn projects_routes() -> Router<FeatureState> {
    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route("/:id", get(get_project).put(update_project).delete(delete_project))
}

#[tracing::instrument(skip(state, command), fields(name = %command.name))]
async fn create_project(
    State(state): State<FeatureState>,
    ActingUser(user): ActingUser,
    Json(mut command): Json<CreateProjectCommand>,
) -> Result<Response, ProjectApiError> {
    command.owner_id = user;
    let project = super::commands::create::handle(state.db, command).await?;
    Ok(ApiResponse::created(project).into_response())
}

#[tracing::instrument(skip(state))]
async fn get_project(
    State(state): State<FeatureState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ProjectApiError> {
    let project = super::queries::get::handle(state.db, GetProjectQuery { id }).await?;
    Ok(ApiResponse::success(project).into_response())
}

#[tracing::instrument(skip(state, query))]
async fn list_projects(
    State(state): State<FeatureState>,
    Query(query): Query<ListProjectsQuery>,
) -> Result<Response, ProjectApiError> {
    let page = super::queries::list::handle(state.db, query).await?;
    let meta = json!({ "pagination": page.pagination });
    Ok(ApiResponse::success_with_meta(page.items, meta).into_response())
}

#[tracing::instrument(skip(state, command))]
async fn update_project(
    State(state): State<FeatureState>,
    Path(id): Path<Uuid>,
    Json(mut command): Json<UpdateProjectCommand>,
) -> Result<Response, ProjectApiError> {
    command.id = id;
    let project = super::commands::update::handle(state.db, command).await?;
    Ok(ApiResponse::success(project).into_response())
}

#[tracing::instrument(skip(state))]
async fn delete_project(
    State(state): State<FeatureState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ProjectApiError> {
    let response =
        super::commands::delete::handle(state.db, state.storage, DeleteProjectCommand { id }).await?;
    Ok(ApiResponse::success(response).into_response())
}

#[derive(Debug)]
enum ProjectApiError {
    Create(CreateProjectError),
    Update(UpdateProjectError),
    Delete(DeleteProjectError),
    Get(GetProjectError),
    List(ListProjectsError),
}

impl From<CreateProjectError> for ProjectApiError {
    fn from(err: CreateProjectError) -> Self {
        Self::Create(err)
    }
}

impl From<UpdateProjectError> for ProjectApiError {
    fn from(err: UpdateProjectError) -> Self {
        Self::Update(err)
    }
}

impl From<DeleteProjectError> for ProjectApiError {
    fn from(err: DeleteProjectError) -> Self {
        Self::Delete(err)
    }
}

impl From<GetProjectError> for ProjectApiError {
    fn from(err: GetProjectError) -> Self {
        Self::Get(err)
    }
}

impl From<ListProjectsError> for ProjectApiError {
    fn from(err: ListProjectsError) -> Self {
        Self::List(err)
    }
}

impl IntoResponse for ProjectApiError {
    fn into_response(self) -> Response {
        match self {
            ProjectApiError::Create(
                e @ (CreateProjectError::NameValidation(_)
                | CreateProjectError::DescriptionValidation(_)
                | CreateProjectError::ClassNamesValidation(_)),
            ) => error_response(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", e.to_string()),
            ProjectApiError::Update(
                e @ (UpdateProjectError::NoFieldsToUpdate
                | UpdateProjectError::NameValidation(_)
                | UpdateProjectError::DescriptionValidation(_)
                | UpdateProjectError::ClassNamesValidation(_)),
            ) => error_response(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", e.to_string()),
            ProjectApiError::List(e @ ListProjectsError::InvalidPagination(_)) => {
                error_response(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", e.to_string())
            },
            ProjectApiError::Create(e @ CreateProjectError::OwnerNotFound(_)) => {
                error_response(StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
            },
            ProjectApiError::Update(e @ UpdateProjectError::NotFound(_)) => {
                error_response(StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
            },
            ProjectApiError::Delete(e @ DeleteProjectError::NotFound(_)) => {
                error_response(StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
            },
            ProjectApiError::Get(e @ GetProjectError::NotFound(_)) => {
                error_response(StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
            },
            ProjectApiError::Create(CreateProjectError::Database(e))
            | ProjectApiError::Update(UpdateProjectError::Database(e))
            | ProjectApiError::Delete(DeleteProjectError::Database(e))
            | ProjectApiError::Get(GetProjectError::Database(e))
            | ProjectApiError::List(ListProjectsError::Database(e)) => {
                tracing::error!("Database error in project operation: {}", e);
                internal_error()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_statuses() {
        let resp = ProjectApiError::Update(UpdateProjectError::NoFieldsToUpdate).into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let resp = ProjectApiError::Get(GetProjectError::NotFound(Uuid::nil())).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = ProjectApiError::List(ListProjectsError::Database(sqlx::Error::PoolTimedOut)).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
