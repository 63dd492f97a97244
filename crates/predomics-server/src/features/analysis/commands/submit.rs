//! Submit an analysis run
//!
//! Validates the engine parameters, binds files to roles and records a
//! `pending` job. Launching the engine is left to the caller (see
//! [`crate::features::analysis::orchestrator`]).

use mediator::Request;
use predomics_common::types::{FileRole, JobStatus};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::engine::config::{ConfigValidationError, RunConfig};
use crate::features::analysis::types::{ResolvedFile, RoleFiles};
use crate::features::projects::types::fetch_project;

/// A file picked for the run, optionally under a different role than the
/// one it is tagged with
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileRef {
    pub file_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<FileRole>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRunCommand {
    #[serde(skip)]
    pub project_id: Uuid,
    /// Engine parameters; missing sections and fields take their defaults
    #[serde(default)]
    pub config: serde_json::Value,
    /// Empty to bind roles from every file of the project's datasets
    #[serde(default)]
    pub files: Vec<FileRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmitRunResponse {
    pub job_id: Uuid,
    pub project_id: Uuid,
    pub status: JobStatus,
    pub files: RoleFiles,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitRunError {
    #[error("Project '{0}' not found")]
    ProjectNotFound(Uuid),

    #[error("Project '{0}' is archived")]
    ProjectArchived(Uuid),

    #[error(transparent)]
    InvalidConfig(#[from] ConfigValidationError),

    #[error("File '{0}' not found in the project's datasets")]
    FileNotFound(Uuid),

    #[error("{0}")]
    Roles(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<SubmitRunResponse, SubmitRunError>> for SubmitRunCommand {}

impl crate::cqrs::middleware::Command for SubmitRunCommand {}

/// A file eligible for the run, with the role it would fill
#[derive(Debug, Clone, sqlx::FromRow)]
struct Candidate {
    id: Uuid,
    dataset_id: Uuid,
    filename: String,
    #[sqlx(try_from = "String")]
    role: FileRole,
}

impl Candidate {
    fn resolved(&self) -> ResolvedFile {
        ResolvedFile {
            file_id: self.id,
            dataset_id: self.dataset_id,
            filename: self.filename.clone(),
        }
    }
}

/// Bind each role to one file.
///
/// With `explicit` set every candidate must carry a usable role and no role
/// may repeat. Otherwise untagged files are skipped and a role held by
/// several files is ambiguous. Either way `xtrain` and `ytrain` are
/// required and `xtest`/`ytest` come as a pair.
pub fn resolve_roles(
    candidates: impl IntoIterator<Item = (FileRole, ResolvedFile)>,
    explicit: bool,
) -> Result<RoleFiles, String> {
    let mut roles = RoleFiles::new();

    for (role, file) in candidates {
        if role == FileRole::Unassigned {
            if explicit {
                return Err(format!(
                    "File '{}' has no role; tag it or pass a role with the reference",
                    file.filename
                ));
            }
            continue;
        }
        if let Some(existing) = roles.get(&role) {
            return Err(if explicit {
                format!("Role '{}' is given more than once", role)
            } else {
                format!(
                    "Role '{}' is ambiguous: held by '{}' and '{}'; pass the files explicitly",
                    role, existing.filename, file.filename
                )
            });
        }
        roles.insert(role, file);
    }

    let missing: Vec<&str> = [FileRole::XTrain, FileRole::YTrain]
        .iter()
        .filter(|r| !roles.contains_key(r))
        .map(|r| r.as_str())
        .collect();
    if !missing.is_empty() {
        return Err(format!("Missing required role(s): {}", missing.join(", ")));
    }

    match (roles.contains_key(&FileRole::XTest), roles.contains_key(&FileRole::YTest)) {
        (true, false) => Err("'xtest' given without 'ytest'".to_string()),
        (false, true) => Err("'ytest' given without 'xtest'".to_string()),
        _ => Ok(roles),
    }
}

async fn project_candidates(pool: &PgPool, project_id: Uuid) -> Result<Vec<Candidate>, sqlx::Error> {
    sqlx::query_as::<_, Candidate>(
        r#"
        SELECT f.id, f.dataset_id, f.filename, f.role
        FROM dataset_files f
        JOIN project_datasets pd ON pd.dataset_id = f.dataset_id
        WHERE pd.project_id = $1
        ORDER BY f.created_at ASC, f.filename ASC
        "#,
    )
    .bind(project_id)
    .fetch_all(pool)
    .await
}

#[tracing::instrument(skip(pool, command), fields(project_id = %command.project_id))]
pub async fn handle(pool: PgPool, command: SubmitRunCommand) -> Result<SubmitRunResponse, SubmitRunError> {
    let project = fetch_project(&pool, command.project_id)
        .await?
        .ok_or(SubmitRunError::ProjectNotFound(command.project_id))?;
    if project.archived {
        return Err(SubmitRunError::ProjectArchived(project.id));
    }

    let config = match command.config {
        serde_json::Value::Null => serde_json::json!({}),
        other => other,
    };
    let mut config = RunConfig::from_json(config)?;
    if config.data.classes.is_empty() {
        config.data.classes = project.class_names.clone();
    }

    let candidates = project_candidates(&pool, project.id).await?;
    let files = if command.files.is_empty() {
        resolve_roles(candidates.iter().map(|c| (c.role, c.resolved())), false)
    } else {
        let mut picked = Vec::with_capacity(command.files.len());
        for file_ref in &command.files {
            let candidate = candidates
                .iter()
                .find(|c| c.id == file_ref.file_id)
                .ok_or(SubmitRunError::FileNotFound(file_ref.file_id))?;
            picked.push((file_ref.role.unwrap_or(candidate.role), candidate.resolved()));
        }
        resolve_roles(picked, true)
    }
    .map_err(SubmitRunError::Roles)?;

    let config_json = serde_json::to_value(&config)
        .map_err(|e| ConfigValidationError(vec![e.to_string()]))?;

    let job_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO jobs (project_id, status, config, files, max_generations)
        VALUES ($1, 'pending', $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(project.id)
    .bind(Json(&config_json))
    .bind(Json(&files))
    .bind(config.max_generations())
    .fetch_one(&pool)
    .await?;

    tracing::info!(
        job_id = %job_id,
        algo = ?config.general.algo,
        roles = ?files.keys().collect::<Vec<_>>(),
        "Job submitted"
    );

    Ok(SubmitRunResponse {
        job_id,
        project_id: project.id,
        status: JobStatus::Pending,
        files,
    })
}
