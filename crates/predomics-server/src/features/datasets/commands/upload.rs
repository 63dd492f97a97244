//! Upload a tabular file into a dataset
//!
//! Files arrive either for a project (joining one of its datasets, or a new
//! dataset named after the file) or directly for a dataset. Content is
//! parsed before anything is stored so malformed tables are rejected up
//! front, and the statistics for the requested role are recorded with the
//! file row.

use predomics_common::tabular::{self, TableStats};
use predomics_common::types::FileRole;
use predomics_common::CommonError;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::features::datasets::types::{DatasetFile, FILE_COLUMNS};
use crate::storage::Storage;

const ALLOWED_EXTENSIONS: [&str; 3] = ["tsv", "csv", "txt"];
const MAX_FILENAME_LENGTH: usize = 255;

/// Where an uploaded file lands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadTarget {
    /// Into a project; `dataset_id` must be assigned to it, or `None` to
    /// create a new dataset for the file
    Project {
        project_id: Uuid,
        dataset_id: Option<Uuid>,
    },
    Dataset { dataset_id: Uuid },
}

#[derive(Clone)]
pub struct UploadFileCommand {
    pub target: UploadTarget,
    pub filename: String,
    pub role: FileRole,
    pub content: Vec<u8>,
    pub max_bytes: usize,
}

impl std::fmt::Debug for UploadFileCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadFileCommand")
            .field("target", &self.target)
            .field("filename", &self.filename)
            .field("role", &self.role)
            .field("size", &self.content.len())
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UploadFileError {
    #[error("{0}")]
    Validation(String),

    #[error("File content rejected: {0}")]
    InvalidContent(#[from] CommonError),

    #[error("Project '{0}' not found")]
    ProjectNotFound(Uuid),

    #[error("Dataset '{0}' not found")]
    DatasetNotFound(Uuid),

    #[error("Dataset '{dataset_id}' is not assigned to project '{project_id}'")]
    NotAssigned { dataset_id: Uuid, project_id: Uuid },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl mediator::Request<Result<DatasetFile, UploadFileError>> for UploadFileCommand {}

impl crate::cqrs::middleware::Command for UploadFileCommand {}

/// Strip any client-side directory and check name and extension
pub fn sanitize_filename(raw: &str) -> Result<String, UploadFileError> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim();

    if name.is_empty() || name == "." || name == ".." {
        return Err(UploadFileError::Validation("Filename is required".to_string()));
    }
    if name.chars().count() > MAX_FILENAME_LENGTH {
        return Err(UploadFileError::Validation(format!(
            "Filename must be at most {} characters",
            MAX_FILENAME_LENGTH
        )));
    }

    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(UploadFileError::Validation(format!(
            "Unsupported file type '{}': expected one of .tsv, .csv, .txt",
            name
        )));
    }

    Ok(name.to_string())
}

/// Statistics for `content` read as `role`. Unassigned files are read as a
/// matrix first and as a label vector if that fails.
pub fn compute_stats(content: &[u8], role: FileRole) -> Result<TableStats, CommonError> {
    match tabular::inspect(content, role) {
        Ok(stats) => Ok(stats),
        Err(matrix_err) if role == FileRole::Unassigned => {
            tabular::inspect(content, FileRole::YTrain).map_err(|_| matrix_err)
        },
        Err(e) => Err(e),
    }
}

impl UploadFileCommand {
    pub fn validate(&self) -> Result<String, UploadFileError> {
        let filename = sanitize_filename(&self.filename)?;
        if self.content.is_empty() {
            return Err(UploadFileError::Validation("File is empty".to_string()));
        }
        if self.content.len() > self.max_bytes {
            return Err(UploadFileError::Validation(format!(
                "File is {} bytes, above the {} byte limit",
                self.content.len(),
                self.max_bytes
            )));
        }
        Ok(filename)
    }
}

/// Dataset the file goes into, and whether it has to be created first
enum Destination {
    Existing(Uuid),
    New {
        dataset_id: Uuid,
        project_id: Uuid,
        owner_id: Option<Uuid>,
    },
}

async fn resolve_destination(pool: &PgPool, target: UploadTarget) -> Result<Destination, UploadFileError> {
    let dataset_exists = |id: Uuid| async move {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM datasets WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
    };

    match target {
        UploadTarget::Dataset { dataset_id } => {
            if !dataset_exists(dataset_id).await? {
                return Err(UploadFileError::DatasetNotFound(dataset_id));
            }
            Ok(Destination::Existing(dataset_id))
        },
        UploadTarget::Project {
            project_id,
            dataset_id,
        } => {
            let owner: Option<Option<Uuid>> =
                sqlx::query_scalar("SELECT owner_id FROM projects WHERE id = $1")
                    .bind(project_id)
                    .fetch_optional(pool)
                    .await?;
            let owner_id = owner.ok_or(UploadFileError::ProjectNotFound(project_id))?;

            match dataset_id {
                None => Ok(Destination::New {
                    dataset_id: Uuid::new_v4(),
                    project_id,
                    owner_id,
                }),
                Some(dataset_id) => {
                    if !dataset_exists(dataset_id).await? {
                        return Err(UploadFileError::DatasetNotFound(dataset_id));
                    }
                    let assigned: bool = sqlx::query_scalar(
                        "SELECT EXISTS(SELECT 1 FROM project_datasets WHERE project_id = $1 AND dataset_id = $2)",
                    )
                    .bind(project_id)
                    .bind(dataset_id)
                    .fetch_one(pool)
                    .await?;
                    if !assigned {
                        return Err(UploadFileError::NotAssigned {
                            dataset_id,
                            project_id,
                        });
                    }
                    Ok(Destination::Existing(dataset_id))
                },
            }
        },
    }
}

fn dataset_name_for(filename: &str) -> &str {
    match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.trim().is_empty() => stem,
        _ => filename,
    }
}

#[tracing::instrument(skip(pool, storage, command), fields(filename = %command.filename, role = %command.role))]
pub async fn handle(
    pool: PgPool,
    storage: Storage,
    command: UploadFileCommand,
) -> Result<DatasetFile, UploadFileError> {
    let filename = command.validate()?;
    let stats = compute_stats(&command.content, command.role)?;
    let destination = resolve_destination(&pool, command.target).await?;

    let dataset_id = match destination {
        Destination::Existing(id) => id,
        Destination::New { dataset_id, .. } => dataset_id,
    };
    let file_id = Uuid::new_v4();
    let key = Storage::dataset_file_key(dataset_id, file_id, &filename);

    let stored = storage
        .upload(&key, command.content, Some("text/tab-separated-values"))
        .await
        .map_err(|e| UploadFileError::Storage(e.to_string()))?;

    let result = insert_rows(&pool, &destination, file_id, &filename, command.role, &stored, &stats).await;

    match result {
        Ok(file) => {
            tracing::info!(
                file_id = %file.id,
                dataset_id = %file.dataset_id,
                n_features = ?file.n_features,
                n_samples = ?file.n_samples,
                "File uploaded"
            );
            Ok(file)
        },
        Err(e) => {
            storage.delete_best_effort([&key]).await;
            Err(e.into())
        },
    }
}

async fn insert_rows(
    pool: &PgPool,
    destination: &Destination,
    file_id: Uuid,
    filename: &str,
    role: FileRole,
    stored: &crate::storage::UploadResult,
    stats: &TableStats,
) -> Result<DatasetFile, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let dataset_id = match *destination {
        Destination::Existing(id) => {
            sqlx::query("UPDATE datasets SET updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            id
        },
        Destination::New {
            dataset_id,
            project_id,
            owner_id,
        } => {
            sqlx::query("INSERT INTO datasets (id, name, owner_id) VALUES ($1, $2, $3)")
                .bind(dataset_id)
                .bind(dataset_name_for(filename))
                .bind(owner_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("INSERT INTO project_datasets (project_id, dataset_id) VALUES ($1, $2)")
                .bind(project_id)
                .bind(dataset_id)
                .execute(&mut *tx)
                .await?;
            dataset_id
        },
    };

    let file = sqlx::query_as::<_, DatasetFile>(&format!(
        r#"
        INSERT INTO dataset_files
            (id, dataset_id, filename, role, storage_key, size_bytes, checksum,
             n_features, n_samples, class_counts)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {}
        "#,
        FILE_COLUMNS
    ))
    .bind(file_id)
    .bind(dataset_id)
    .bind(filename)
    .bind(role.as_str())
    .bind(&stored.key)
    .bind(stored.size)
    .bind(&stored.checksum)
    .bind(stats.n_features)
    .bind(stats.n_samples)
    .bind(stats.class_counts.clone().map(Json))
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(file)
}
