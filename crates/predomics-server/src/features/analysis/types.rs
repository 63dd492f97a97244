//! Job rows and their client-facing views

use chrono::{DateTime, Utc};
use predomics_common::types::{FileRole, JobStatus};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgPool};
use std::collections::BTreeMap;
use uuid::Uuid;

pub const JOB_COLUMNS: &str = "id, project_id, status, config, files, generation, max_generations, \
     best_fit, error_message, result_key, created_at, started_at, completed_at, updated_at";

/// A file bound to a role at submission time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolvedFile {
    pub file_id: Uuid,
    pub dataset_id: Uuid,
    pub filename: String,
}

/// Role to file snapshot stored with each job
pub type RoleFiles = BTreeMap<FileRole, ResolvedFile>;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Job {
    pub id: Uuid,
    pub project_id: Uuid,
    #[sqlx(try_from = "String")]
    pub status: JobStatus,
    pub config: Json<serde_json::Value>,
    pub files: Json<RoleFiles>,
    pub generation: i32,
    pub max_generations: i32,
    pub best_fit: Option<f64>,
    pub error_message: Option<String>,
    #[serde(skip_serializing)]
    pub result_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Progress {
    pub generation: i32,
    pub max_generations: i32,
    /// 0 to 100; 100 once the job completed
    pub percent: f64,
    pub best_fit: Option<f64>,
}

impl Progress {
    pub fn new(status: JobStatus, generation: i32, max_generations: i32, best_fit: Option<f64>) -> Self {
        let percent = match status {
            JobStatus::Completed => 100.0,
            _ if max_generations > 0 => {
                let raw = f64::from(generation.max(0)) / f64::from(max_generations) * 100.0;
                (raw.min(100.0) * 10.0).round() / 10.0
            },
            _ => 0.0,
        };
        Self {
            generation,
            max_generations,
            percent,
            best_fit,
        }
    }
}

/// Status view of a job, as polled by clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobView {
    pub id: Uuid,
    pub project_id: Uuid,
    pub status: JobStatus,
    pub progress: Progress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub files: RoleFiles,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Job> for JobView {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            project_id: job.project_id,
            status: job.status,
            progress: Progress::new(job.status, job.generation, job.max_generations, job.best_fit),
            error_message: job.error_message,
            files: job.files.0,
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
        }
    }
}

/// Jobs of a project, newest first
pub async fn fetch_project_jobs(pool: &PgPool, project_id: Uuid) -> Result<Vec<JobView>, sqlx::Error> {
    let jobs = sqlx::query_as::<_, Job>(&format!(
        "SELECT {} FROM jobs WHERE project_id = $1 ORDER BY created_at DESC, id ASC",
        JOB_COLUMNS
    ))
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    Ok(jobs.into_iter().map(JobView::from).collect())
}
