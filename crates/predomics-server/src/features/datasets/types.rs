//! Rows shared by the dataset commands and queries, and by the project and
//! share views that embed datasets.

use chrono::{DateTime, Utc};
use predomics_common::tabular::TableStats;
use predomics_common::types::FileRole;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgPool};
use std::collections::BTreeMap;
use uuid::Uuid;

pub const FILE_COLUMNS: &str = "id, dataset_id, filename, role, storage_key, size_bytes, \
     checksum, n_features, n_samples, class_counts, created_at";

pub const DATASET_COLUMNS: &str = "id, name, description, owner_id, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct DatasetFile {
    pub id: Uuid,
    pub dataset_id: Uuid,
    pub filename: String,
    #[sqlx(try_from = "String")]
    pub role: FileRole,
    #[serde(skip_serializing)]
    pub storage_key: String,
    pub size_bytes: i64,
    pub checksum: String,
    pub n_features: Option<i32>,
    pub n_samples: Option<i32>,
    pub class_counts: Option<Json<BTreeMap<String, i64>>>,
    pub created_at: DateTime<Utc>,
}

impl DatasetFile {
    pub fn stats(&self) -> TableStats {
        TableStats {
            n_features: self.n_features,
            n_samples: self.n_samples,
            class_counts: self.class_counts.as_ref().map(|c| c.0.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Dataset {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A dataset group together with its files
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetWithFiles {
    #[serde(flatten)]
    pub dataset: Dataset,
    pub files: Vec<DatasetFile>,
}

/// Files of the given datasets, oldest first within each dataset
pub async fn fetch_files(pool: &PgPool, dataset_ids: &[Uuid]) -> Result<Vec<DatasetFile>, sqlx::Error> {
    if dataset_ids.is_empty() {
        return Ok(Vec::new());
    }
    sqlx::query_as::<_, DatasetFile>(&format!(
        "SELECT {} FROM dataset_files WHERE dataset_id = ANY($1) ORDER BY created_at ASC, filename ASC",
        FILE_COLUMNS
    ))
    .bind(dataset_ids)
    .fetch_all(pool)
    .await
}

/// Datasets assigned to a project with their files, in assignment order
pub async fn fetch_project_datasets(
    pool: &PgPool,
    project_id: Uuid,
) -> Result<Vec<DatasetWithFiles>, sqlx::Error> {
    let datasets = sqlx::query_as::<_, Dataset>(
        r#"
        SELECT d.id, d.name, d.description, d.owner_id, d.created_at, d.updated_at
        FROM datasets d
        JOIN project_datasets pd ON pd.dataset_id = d.id
        WHERE pd.project_id = $1
        ORDER BY pd.assigned_at ASC, d.name ASC
        "#,
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    attach_files(pool, datasets).await
}

pub async fn attach_files(
    pool: &PgPool,
    datasets: Vec<Dataset>,
) -> Result<Vec<DatasetWithFiles>, sqlx::Error> {
    let ids: Vec<Uuid> = datasets.iter().map(|d| d.id).collect();
    let mut by_dataset: BTreeMap<Uuid, Vec<DatasetFile>> = BTreeMap::new();
    for file in fetch_files(pool, &ids).await? {
        by_dataset.entry(file.dataset_id).or_default().push(file);
    }

    Ok(datasets
        .into_iter()
        .map(|dataset| DatasetWithFiles {
            files: by_dataset.remove(&dataset.id).unwrap_or_default(),
            dataset,
        })
        .collect())
}
