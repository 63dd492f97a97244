//! Dataset routes
//!
//! Under `/api/datasets`:
//! - `POST /` - Create a dataset
//! - `GET /` - List datasets (`owner_id`, `project_id`, `name_contains`, paging)
//! - `GET|PUT|DELETE /:id` - Get, update or delete a dataset
//! - `POST /:id/files` - Multipart upload into the dataset
//! - `PUT|DELETE /:id/files/:file_id` - Re-tag or delete a file
//!
//! Under `/api/projects` (see [`project_dataset_routes`]):
//! - `POST /:id/datasets` - Assign a dataset (`{"dataset_id": ...}`)
//! - `DELETE /:id/datasets/:dataset_id` - Unassign a dataset
//! - `POST /:id/files` - Multipart upload into the project

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use predomics_common::types::FileRole;
use serde_json::json;
use uuid::Uuid;

use super::{
    commands::{
        AssignDatasetCommand, AssignDatasetError, CreateDatasetCommand, CreateDatasetError,
        DeleteDatasetCommand, DeleteDatasetError, DeleteFileCommand, DeleteFileError,
        SetFileRoleCommand, SetFileRoleError, UnassignDatasetCommand, UnassignDatasetError,
        UpdateDatasetCommand, UpdateDatasetError, UploadFileCommand, UploadFileError, UploadTarget,
    },
    queries::{GetDatasetError, GetDatasetQuery, ListDatasetsError, ListDatasetsQuery},
};
use crate::api::response::{error_response, internal_error, ApiResponse};
use crate::features::FeatureState;
use crate::middleware::ActingUser;

pub fn datasets_routes() -> Router<FeatureState> {
    Router::new()
        .route("/", get(list_datasets).post(create_dataset))
        .route("/:id", get(get_dataset).put(update_dataset).delete(delete_dataset))
        .route("/:id/files", post(upload_to_dataset))
        .route("/:id/files/:file_id", put(set_file_role).delete(delete_file))
}

/// Dataset operations mounted below a project
pub fn project_dataset_routes() -> Router<FeatureState> {
    Router::new()
        .route("/:id/datasets", post(assign_dataset))
        .route("/:id/datasets/:dataset_id", axum::routing::delete(unassign_dataset))
        .route("/:id/files", post(upload_to_project))
}

#[tracing::instrument(skip(state, command), fields(name = %command.name))]
async fn create_dataset(
    State(state): State<FeatureState>,
    ActingUser(user): ActingUser,
    Json(mut command): Json<CreateDatasetCommand>,
) -> Result<Response, DatasetApiError> {
    command.owner_id = user;
    let dataset = super::commands::create::handle(state.db, command).await?;
    Ok(ApiResponse::created(dataset).into_response())
}

#[tracing::instrument(skip(state))]
async fn get_dataset(
    State(state): State<FeatureState>,
    Path(id): Path<Uuid>,
) -> Result<Response, DatasetApiError> {
    let dataset = super::queries::get::handle(state.db, GetDatasetQuery { id }).await?;
    Ok(ApiResponse::success(dataset).into_response())
}

#[tracing::instrument(skip(state, query))]
async fn list_datasets(
    State(state): State<FeatureState>,
    Query(query): Query<ListDatasetsQuery>,
) -> Result<Response, DatasetApiError> {
    let page = super::queries::list::handle(state.db, query).await?;
    let meta = json!({ "pagination": page.pagination });
    Ok(ApiResponse::success_with_meta(page.items, meta).into_response())
}

#[tracing::instrument(skip(state, command))]
async fn update_dataset(
    State(state): State<FeatureState>,
    Path(id): Path<Uuid>,
    Json(mut command): Json<UpdateDatasetCommand>,
) -> Result<Response, DatasetApiError> {
    command.id = id;
    let dataset = super::commands::update::handle(state.db, command).await?;
    Ok(ApiResponse::success(dataset).into_response())
}

#[tracing::instrument(skip(state))]
async fn delete_dataset(
    State(state): State<FeatureState>,
    Path(id): Path<Uuid>,
) -> Result<Response, DatasetApiError> {
    let response =
        super::commands::delete::handle(state.db, state.storage, DeleteDatasetCommand { id }).await?;
    Ok(ApiResponse::success(response).into_response())
}

#[tracing::instrument(skip(state, multipart))]
async fn upload_to_dataset(
    State(state): State<FeatureState>,
    Path(dataset_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Response, DatasetApiError> {
    let form = UploadForm::read(multipart, state.max_upload_bytes).await?;
    if form.dataset_id.is_some_and(|id| id != dataset_id) {
        return Err(DatasetApiError::Form(
            "dataset_id field does not match the dataset in the path".to_string(),
        ));
    }
    let command = form.into_command(UploadTarget::Dataset { dataset_id }, state.max_upload_bytes)?;
    let file = super::commands::upload::handle(state.db, state.storage, command).await?;
    Ok(ApiResponse::created(file).into_response())
}

#[tracing::instrument(skip(state, multipart))]
async fn upload_to_project(
    State(state): State<FeatureState>,
    Path(project_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Response, DatasetApiError> {
    let form = UploadForm::read(multipart, state.max_upload_bytes).await?;
    let target = UploadTarget::Project {
        project_id,
        dataset_id: form.dataset_id,
    };
    let command = form.into_command(target, state.max_upload_bytes)?;
    let file = super::commands::upload::handle(state.db, state.storage, command).await?;
    Ok(ApiResponse::created(file).into_response())
}

#[tracing::instrument(skip(state, command))]
async fn set_file_role(
    State(state): State<FeatureState>,
    Path((dataset_id, file_id)): Path<(Uuid, Uuid)>,
    Json(mut command): Json<SetFileRoleCommand>,
) -> Result<Response, DatasetApiError> {
    command.dataset_id = dataset_id;
    command.file_id = file_id;
    let file = super::commands::set_role::handle(state.db, state.storage, command).await?;
    Ok(ApiResponse::success(file).into_response())
}

#[tracing::instrument(skip(state))]
async fn delete_file(
    State(state): State<FeatureState>,
    Path((dataset_id, file_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, DatasetApiError> {
    let command = DeleteFileCommand {
        dataset_id,
        file_id,
    };
    let response = super::commands::delete_file::handle(state.db, state.storage, command).await?;
    Ok(ApiResponse::success(response).into_response())
}

#[tracing::instrument(skip(state, command))]
async fn assign_dataset(
    State(state): State<FeatureState>,
    Path(project_id): Path<Uuid>,
    Json(mut command): Json<AssignDatasetCommand>,
) -> Result<Response, DatasetApiError> {
    command.project_id = project_id;
    let response = super::commands::assign::handle(state.db, command).await?;
    if response.created {
        Ok(ApiResponse::created(response).into_response())
    } else {
        Ok(ApiResponse::success(response).into_response())
    }
}

#[tracing::instrument(skip(state))]
async fn unassign_dataset(
    State(state): State<FeatureState>,
    Path((project_id, dataset_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, DatasetApiError> {
    let command = UnassignDatasetCommand {
        project_id,
        dataset_id,
    };
    let response = super::commands::unassign::handle(state.db, command).await?;
    Ok(ApiResponse::success(response).into_response())
}

/// Fields of an upload form: `file` (required), `role`, `dataset_id`
#[derive(Debug, Default)]
struct UploadForm {
    filename: Option<String>,
    content: Option<Vec<u8>>,
    role: Option<FileRole>,
    dataset_id: Option<Uuid>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart, max_bytes: usize) -> Result<Self, DatasetApiError> {
        let mut form = Self::default();
        let limit = |e| DatasetApiError::from_multipart(e, max_bytes);

        while let Some(field) = multipart.next_field().await.map_err(limit)? {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "file" => {
                    form.filename = field.file_name().map(str::to_string);
                    form.content = Some(field.bytes().await.map_err(limit)?.to_vec());
                },
                "role" => {
                    let text = field.text().await.map_err(limit)?;
                    let text = text.trim();
                    if !text.is_empty() {
                        let role = text
                            .parse::<FileRole>()
                            .map_err(|e| DatasetApiError::Form(e.to_string()))?;
                        form.role = Some(role);
                    }
                },
                "dataset_id" => {
                    let text = field.text().await.map_err(limit)?;
                    let text = text.trim();
                    if !text.is_empty() {
                        let id = Uuid::parse_str(text)
                            .map_err(|_| DatasetApiError::Form(format!("Invalid dataset_id '{}'", text)))?;
                        form.dataset_id = Some(id);
                    }
                },
                other => {
                    tracing::debug!(field = other, "Ignoring unknown upload field");
                },
            }
        }

        Ok(form)
    }

    fn into_command(self, target: UploadTarget, max_bytes: usize) -> Result<UploadFileCommand, DatasetApiError> {
        let content = self
            .content
            .ok_or_else(|| DatasetApiError::Form("Missing 'file' field".to_string()))?;

        Ok(UploadFileCommand {
            target,
            filename: self.filename.unwrap_or_default(),
            role: self.role.unwrap_or_default(),
            content,
            max_bytes,
        })
    }
}

#[derive(Debug)]
enum DatasetApiError {
    Form(String),
    Multipart(MultipartError),
    Create(CreateDatasetError),
    Update(UpdateDatasetError),
    Delete(DeleteDatasetError),
    Get(GetDatasetError),
    List(ListDatasetsError),
    Upload(UploadFileError),
    SetRole(SetFileRoleError),
    DeleteFile(DeleteFileError),
    Assign(AssignDatasetError),
    Unassign(UnassignDatasetError),
}

impl DatasetApiError {
    /// Body-limit hits become the same validation error as an oversized file
    fn from_multipart(err: MultipartError, max_bytes: usize) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::Form(format!("File is above the {} byte limit", max_bytes))
        } else {
            Self::Multipart(err)
        }
    }
}

macro_rules! impl_from {
    ($($err:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$err> for DatasetApiError {
                fn from(err: $err) -> Self {
                    Self::$variant(err)
                }
            }
        )*
    };
}

impl_from! {
    CreateDatasetError => Create,
    UpdateDatasetError => Update,
    DeleteDatasetError => Delete,
    GetDatasetError => Get,
    ListDatasetsError => List,
    UploadFileError => Upload,
    SetFileRoleError => SetRole,
    DeleteFileError => DeleteFile,
    AssignDatasetError => Assign,
    UnassignDatasetError => Unassign,
}

fn validation(message: impl Into<String>) -> Response {
    error_response(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
}

fn not_found(message: impl Into<String>) -> Response {
    error_response(StatusCode::NOT_FOUND, "NOT_FOUND", message)
}

fn database(err: sqlx::Error) -> Response {
    tracing::error!("Database error in dataset operation: {}", err);
    internal_error()
}

impl IntoResponse for DatasetApiError {
    fn into_response(self) -> Response {
        match self {
            DatasetApiError::Form(message) => validation(message),
            DatasetApiError::Multipart(e) => {
                error_response(e.status(), "INVALID_MULTIPART", e.body_text())
            },

            DatasetApiError::Create(
                e @ (CreateDatasetError::NameValidation(_) | CreateDatasetError::DescriptionValidation(_)),
            ) => validation(e.to_string()),
            DatasetApiError::Create(e @ CreateDatasetError::OwnerNotFound(_)) => not_found(e.to_string()),
            DatasetApiError::Create(CreateDatasetError::Database(e)) => database(e),

            DatasetApiError::Update(
                e @ (UpdateDatasetError::NoFieldsToUpdate
                | UpdateDatasetError::NameValidation(_)
                | UpdateDatasetError::DescriptionValidation(_)),
            ) => validation(e.to_string()),
            DatasetApiError::Update(e @ UpdateDatasetError::NotFound(_)) => not_found(e.to_string()),
            DatasetApiError::Update(UpdateDatasetError::Database(e)) => database(e),

            DatasetApiError::Delete(e @ DeleteDatasetError::NotFound(_)) => not_found(e.to_string()),
            DatasetApiError::Delete(DeleteDatasetError::Database(e)) => database(e),

            DatasetApiError::Get(e @ GetDatasetError::NotFound(_)) => not_found(e.to_string()),
            DatasetApiError::Get(GetDatasetError::Database(e)) => database(e),

            DatasetApiError::List(e @ ListDatasetsError::InvalidPagination(_)) => validation(e.to_string()),
            DatasetApiError::List(ListDatasetsError::Database(e)) => database(e),

            DatasetApiError::Upload(
                e @ (UploadFileError::Validation(_) | UploadFileError::InvalidContent(_)),
            ) => validation(e.to_string()),
            DatasetApiError::Upload(
                e @ (UploadFileError::ProjectNotFound(_)
                | UploadFileError::DatasetNotFound(_)
                | UploadFileError::NotAssigned { .. }),
            ) => not_found(e.to_string()),
            DatasetApiError::Upload(e @ UploadFileError::Storage(_)) => {
                tracing::error!("Storage error during upload: {}", e);
                internal_error()
            },
            DatasetApiError::Upload(UploadFileError::Database(e)) => database(e),

            DatasetApiError::SetRole(e @ SetFileRoleError::InvalidContent(_)) => validation(e.to_string()),
            DatasetApiError::SetRole(e @ SetFileRoleError::NotFound { .. }) => not_found(e.to_string()),
            DatasetApiError::SetRole(e @ SetFileRoleError::Storage(_)) => {
                tracing::error!("Storage error while re-tagging file: {}", e);
                internal_error()
            },
            DatasetApiError::SetRole(SetFileRoleError::Database(e)) => database(e),

            DatasetApiError::DeleteFile(e @ DeleteFileError::NotFound { .. }) => not_found(e.to_string()),
            DatasetApiError::DeleteFile(DeleteFileError::Database(e)) => database(e),

            DatasetApiError::Assign(
                e @ (AssignDatasetError::ProjectNotFound(_) | AssignDatasetError::DatasetNotFound(_)),
            ) => not_found(e.to_string()),
            DatasetApiError::Assign(AssignDatasetError::Database(e)) => database(e),

            DatasetApiError::Unassign(
                e @ (UnassignDatasetError::ProjectNotFound(_) | UnassignDatasetError::DatasetNotFound(_)),
            ) => not_found(e.to_string()),
            DatasetApiError::Unassign(UnassignDatasetError::Database(e)) => database(e),
        }
    }
}
