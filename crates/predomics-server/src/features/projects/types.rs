use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::analysis::types::{fetch_project_jobs, JobView};
use crate::features::datasets::types::{fetch_project_datasets, DatasetWithFiles};

pub const PROJECT_COLUMNS: &str =
    "id, name, description, owner_id, archived, class_names, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Option<Uuid>,
    pub archived: bool,
    pub class_names: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A project with its datasets and jobs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub datasets: Vec<DatasetWithFiles>,
    pub jobs: Vec<JobView>,
}

pub async fn fetch_project(pool: &PgPool, id: Uuid) -> Result<Option<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(&format!("SELECT {} FROM projects WHERE id = $1", PROJECT_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn fetch_project_detail(pool: &PgPool, id: Uuid) -> Result<Option<ProjectDetail>, sqlx::Error> {
    let Some(project) = fetch_project(pool, id).await? else {
        return Ok(None);
    };

    let datasets = fetch_project_datasets(pool, id).await?;
    let jobs = fetch_project_jobs(pool, id).await?;

    Ok(Some(ProjectDetail {
        project,
        datasets,
        jobs,
    }))
}
