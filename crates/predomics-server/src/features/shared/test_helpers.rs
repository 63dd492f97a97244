//! Test fixtures for database tests
//!
//! ```rust,ignore
//! #[sqlx::test]
//! async fn test_something(pool: PgPool) -> sqlx::Result<()> {
//!     let (_dir, storage) = local_storage().await;
//!     let project = TestProject::new("Crohn").insert(&pool).await?;
//!     let dataset = TestDataset::new("cohort").insert(&pool).await?;
//!     TestProject::assign(&pool, project, dataset).await?;
//!     let x = TestFile::matrix(dataset).store(&pool, &storage).await?;
//!     Ok(())
//! }
//! ```

use predomics_common::types::{FileRole, JobStatus};
use sqlx::{types::Json, PgPool};
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

use crate::features::datasets::commands::upload::compute_stats;
use crate::features::datasets::types::{DatasetFile, FILE_COLUMNS};
use crate::storage::{LocalBackend, Storage};

/// Three features by four samples
pub const MATRIX_TSV: &str = "feature\ts1\ts2\ts3\ts4\n\
                              msp_0001\t0.12\t0\t0.3\t0.05\n\
                              msp_0002\t0\t0.2\t0\t0.11\n\
                              msp_0003\t1.5\t0.7\t0\t0\n";

/// Labels for the four samples of [`MATRIX_TSV`]
pub const LABELS_TSV: &str = "sample\tclass\ns1\t0\ns2\t0\ns3\t1\ns4\t1\n";

/// Not a real hash; fixtures never log in
const FIXTURE_PASSWORD_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$Zml4dHVyZQ$Zml4dHVyZQ";

/// Storage rooted in a fresh temporary directory. Keep the `TempDir` alive
/// for the duration of the test.
pub async fn local_storage() -> (TempDir, Storage) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let backend = LocalBackend::new(dir.path()).await.expect("create local backend");
    (dir, Storage::from_backend(Arc::new(backend)))
}

#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub is_admin: bool,
}

impl TestUser {
    pub fn new(email: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            is_admin: false,
        }
    }

    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }

    pub async fn insert(self, pool: &PgPool) -> sqlx::Result<Uuid> {
        sqlx::query("INSERT INTO users (id, email, password_hash, is_admin) VALUES ($1, $2, $3, $4)")
            .bind(self.id)
            .bind(&self.email)
            .bind(FIXTURE_PASSWORD_HASH)
            .bind(self.is_admin)
            .execute(pool)
            .await?;
        Ok(self.id)
    }
}

#[derive(Debug, Clone)]
pub struct TestProject {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Option<Uuid>,
    pub archived: bool,
    pub class_names: Vec<String>,
}

impl TestProject {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            owner_id: None,
            archived: false,
            class_names: vec!["healthy".to_string(), "sick".to_string()],
        }
    }

    pub fn with_owner(mut self, owner_id: Uuid) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    pub fn archived(mut self) -> Self {
        self.archived = true;
        self
    }

    pub async fn insert(self, pool: &PgPool) -> sqlx::Result<Uuid> {
        sqlx::query(
            "INSERT INTO projects (id, name, owner_id, archived, class_names) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(self.id)
        .bind(&self.name)
        .bind(self.owner_id)
        .bind(self.archived)
        .bind(&self.class_names)
        .execute(pool)
        .await?;
        Ok(self.id)
    }

    /// Attach a dataset to a project
    pub async fn assign(pool: &PgPool, project_id: Uuid, dataset_id: Uuid) -> sqlx::Result<()> {
        sqlx::query("INSERT INTO project_datasets (project_id, dataset_id) VALUES ($1, $2)")
            .bind(project_id)
            .bind(dataset_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct TestDataset {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Option<Uuid>,
}

impl TestDataset {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            owner_id: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_owner(mut self, owner_id: Uuid) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    pub async fn insert(self, pool: &PgPool) -> sqlx::Result<Uuid> {
        sqlx::query("INSERT INTO datasets (id, name, description, owner_id) VALUES ($1, $2, $3, $4)")
            .bind(self.id)
            .bind(&self.name)
            .bind(&self.description)
            .bind(self.owner_id)
            .execute(pool)
            .await?;
        Ok(self.id)
    }
}

/// A file whose bytes are written to storage alongside its row
#[derive(Debug, Clone)]
pub struct TestFile {
    pub dataset_id: Uuid,
    pub filename: String,
    pub role: FileRole,
    pub content: String,
}

impl TestFile {
    /// [`MATRIX_TSV`] tagged `xtrain`
    pub fn matrix(dataset_id: Uuid) -> Self {
        Self {
            dataset_id,
            filename: "X_train.tsv".to_string(),
            role: FileRole::XTrain,
            content: MATRIX_TSV.to_string(),
        }
    }

    /// [`LABELS_TSV`] tagged `ytrain`
    pub fn labels(dataset_id: Uuid) -> Self {
        Self {
            dataset_id,
            filename: "y_train.tsv".to_string(),
            role: FileRole::YTrain,
            content: LABELS_TSV.to_string(),
        }
    }

    pub fn with_role(mut self, role: FileRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_filename(mut self, filename: &str) -> Self {
        self.filename = filename.to_string();
        self
    }

    pub fn with_content(mut self, content: &str) -> Self {
        self.content = content.to_string();
        self
    }

    pub async fn store(self, pool: &PgPool, storage: &Storage) -> sqlx::Result<DatasetFile> {
        let file_id = Uuid::new_v4();
        let key = Storage::dataset_file_key(self.dataset_id, file_id, &self.filename);
        let stats = compute_stats(self.content.as_bytes(), self.role).unwrap_or_default();
        let stored = storage
            .upload(&key, self.content.into_bytes(), None)
            .await
            .expect("store fixture file");

        sqlx::query_as::<_, DatasetFile>(&format!(
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
        .bind(self.dataset_id)
        .bind(&self.filename)
        .bind(self.role.as_str())
        .bind(&stored.key)
        .bind(stored.size)
        .bind(&stored.checksum)
        .bind(stats.n_features)
        .bind(stats.n_samples)
        .bind(stats.class_counts.map(Json))
        .fetch_one(pool)
        .await
    }
}

/// A job row inserted directly in any status
#[derive(Debug, Clone)]
pub struct TestJob {
    pub id: Uuid,
    pub project_id: Uuid,
    pub status: JobStatus,
    pub config: serde_json::Value,
    pub max_generations: i32,
    pub result_key: Option<String>,
    pub error_message: Option<String>,
}

impl TestJob {
    pub fn new(project_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            status: JobStatus::Pending,
            config: serde_json::json!({}),
            max_generations: 200,
            result_key: None,
            error_message: None,
        }
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_result_key(mut self, key: &str) -> Self {
        self.result_key = Some(key.to_string());
        self
    }

    pub fn with_error(mut self, message: &str) -> Self {
        self.error_message = Some(message.to_string());
        self
    }

    pub async fn insert(self, pool: &PgPool) -> sqlx::Result<Uuid> {
        sqlx::query(
            r#"
            INSERT INTO jobs (id, project_id, status, config, max_generations, result_key, error_message)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(self.id)
        .bind(self.project_id)
        .bind(self.status.as_str())
        .bind(Json(&self.config))
        .bind(self.max_generations)
        .bind(&self.result_key)
        .bind(&self.error_message)
        .execute(pool)
        .await?;
        Ok(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_content_parses() {
        let stats = compute_stats(MATRIX_TSV.as_bytes(), FileRole::XTrain).unwrap();
        assert_eq!(stats.n_features, Some(3));
        assert_eq!(stats.n_samples, Some(4));

        let stats = compute_stats(LABELS_TSV.as_bytes(), FileRole::YTrain).unwrap();
        assert_eq!(stats.n_samples, Some(4));
    }

    #[test]
    fn test_builders() {
        let project = TestProject::new("p").archived();
        assert!(project.archived);

        let file = TestFile::labels(Uuid::nil()).with_role(FileRole::YTest);
        assert_eq!(file.role, FileRole::YTest);
        assert_eq!(file.filename, "y_train.tsv");
    }
}
