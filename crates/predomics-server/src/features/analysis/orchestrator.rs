//! Runs submitted jobs through the engine
//!
//! Each job is driven by one spawned task: claim the job (`pending ->
//! running`), copy its role files into a work directory, run the engine
//! while recording progress, then store the result bundle and complete the
//! job. Any error fails the job with its message; nothing is reported back
//! to the request that submitted it.
//!
//! Status changes are guarded updates (`WHERE status = ANY(<legal
//! predecessors>)`), so a job can never move backwards even if two tasks
//! race on it.

use predomics_common::types::{FileRole, JobStatus};
use sqlx::PgPool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::types::{Job, RoleFiles, JOB_COLUMNS};
use crate::config::EngineConfig;
use crate::engine::config::{ConfigValidationError, RunConfig};
use crate::engine::{DataPaths, Engine, EngineError, EngineInvocation, ProgressUpdate};
use crate::storage::Storage;

/// Upper bound on stored failure messages
const MAX_ERROR_MESSAGE_CHARS: usize = 4000;

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("Job '{0}' is no longer pending")]
    NotPending(Uuid),

    #[error("Job '{job_id}' could not move to {to}: status changed concurrently")]
    StatusConflict { job_id: Uuid, to: JobStatus },

    #[error(transparent)]
    InvalidConfig(#[from] ConfigValidationError),

    #[error("Role '{0}' has no file bound")]
    MissingRole(FileRole),

    #[error("File '{filename}' bound to '{role}' no longer exists")]
    FileGone { role: FileRole, filename: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Work directory error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Handle for launching jobs; cheap to clone
#[derive(Clone)]
pub struct Orchestrator {
    pool: PgPool,
    storage: Storage,
    engine: Arc<dyn Engine>,
    config: Arc<EngineConfig>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("work_dir", &self.config.work_dir)
            .finish_non_exhaustive()
    }
}

fn statuses(list: &[JobStatus]) -> Vec<&'static str> {
    list.iter().map(|s| s.as_str()).collect()
}

fn truncate_message(message: &str) -> String {
    if message.chars().count() <= MAX_ERROR_MESSAGE_CHARS {
        message.to_string()
    } else {
        let mut cut: String = message.chars().take(MAX_ERROR_MESSAGE_CHARS).collect();
        cut.push_str("...");
        cut
    }
}

impl Orchestrator {
    pub fn new(pool: PgPool, storage: Storage, engine: Arc<dyn Engine>, config: EngineConfig) -> Self {
        Self {
            pool,
            storage,
            engine,
            config: Arc::new(config),
        }
    }

    /// Run the job on a background task
    pub fn spawn(&self, job_id: Uuid) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move { this.execute(job_id).await })
    }

    /// Drive a job to a terminal state. Never returns an error: failures
    /// are recorded on the job.
    #[instrument(skip(self))]
    pub async fn execute(&self, job_id: Uuid) {
        let work_dir = work_dir_for(&self.config, job_id);

        match self.run(job_id, &work_dir).await {
            Ok(()) => {},
            Err(ExecuteError::NotPending(_)) => {
                warn!("Job was not pending; skipping");
                return;
            },
            Err(e) => {
                error!(error = %e, "Job failed");
                if let Err(db) = self.mark_failed(job_id, &e.to_string()).await {
                    error!(error = %db, "Could not record job failure");
                }
            },
        }

        if !self.config.keep_work_dir {
            if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(dir = %work_dir.display(), error = %e, "Could not remove work directory");
                }
            }
        }
    }

    async fn run(&self, job_id: Uuid, work_dir: &Path) -> Result<(), ExecuteError> {
        let job = self.claim(job_id).await?;
        let config = RunConfig::from_json(job.config.0.clone())?;

        tokio::fs::create_dir_all(work_dir).await?;
        let data = self.materialize(&job.files.0, work_dir).await?;

        let invocation = EngineInvocation {
            job_id,
            config,
            data,
            work_dir: work_dir.to_path_buf(),
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let recorder = tokio::spawn(record_progress(self.pool.clone(), job_id, rx));

        let outcome = self.engine.run(&invocation, tx).await;
        // the sender is gone once run returns, so the recorder drains and stops
        if let Err(e) = recorder.await {
            warn!(error = %e, "Progress recorder task ended abnormally");
        }
        let bundle = outcome?;

        let key = Storage::result_key(job.project_id, job_id);
        let body = serde_json::to_vec(&bundle.0).map_err(EngineError::InvalidResult)?;
        self.storage
            .upload(&key, body, Some("application/json"))
            .await
            .map_err(|e| ExecuteError::Storage(e.to_string()))?;

        if let Err(e) = self.complete(job_id, &key).await {
            self.storage.delete_best_effort([&key]).await;
            return Err(e);
        }

        info!(result_key = %key, "Job completed");
        Ok(())
    }

    async fn claim(&self, job_id: Uuid) -> Result<Job, ExecuteError> {
        sqlx::query_as::<_, Job>(&format!(
            r#"
            UPDATE jobs
            SET status = 'running', started_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = ANY($2)
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(job_id)
        .bind(statuses(&JobStatus::predecessors(JobStatus::Running)))
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ExecuteError::NotPending(job_id))
    }

    async fn complete(&self, job_id: Uuid, result_key: &str) -> Result<(), ExecuteError> {
        let updated = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'completed', result_key = $2, completed_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = ANY($3)
            "#,
        )
        .bind(job_id)
        .bind(result_key)
        .bind(statuses(&JobStatus::predecessors(JobStatus::Completed)))
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(ExecuteError::StatusConflict {
                job_id,
                to: JobStatus::Completed,
            });
        }
        Ok(())
    }

    async fn mark_failed(&self, job_id: Uuid, message: &str) -> Result<bool, sqlx::Error> {
        let updated = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'failed', error_message = $2, completed_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = ANY($3)
            "#,
        )
        .bind(job_id)
        .bind(truncate_message(message))
        .bind(statuses(&JobStatus::predecessors(JobStatus::Failed)))
        .execute(&self.pool)
        .await?;
        Ok(updated.rows_affected() == 1)
    }

    /// Copy the bound files into the work directory
    async fn materialize(&self, files: &RoleFiles, work_dir: &Path) -> Result<DataPaths, ExecuteError> {
        let mut paths = std::collections::BTreeMap::new();

        for (role, file) in files {
            let key: Option<String> =
                sqlx::query_scalar("SELECT storage_key FROM dataset_files WHERE id = $1")
                    .bind(file.file_id)
                    .fetch_optional(&self.pool)
                    .await?;
            let key = key.ok_or_else(|| ExecuteError::FileGone {
                role: *role,
                filename: file.filename.clone(),
            })?;

            let bytes = self
                .storage
                .download(&key)
                .await
                .map_err(|e| ExecuteError::Storage(e.to_string()))?;

            let path = work_dir.join(format!("{}_{}", role.as_str(), file.filename));
            tokio::fs::write(&path, bytes).await?;
            debug!(role = %role, path = %path.display(), "Materialized input file");
            paths.insert(*role, path);
        }

        let mut take = |role: FileRole| paths.remove(&role);
        Ok(DataPaths {
            x_train: take(FileRole::XTrain).ok_or(ExecuteError::MissingRole(FileRole::XTrain))?,
            y_train: take(FileRole::YTrain).ok_or(ExecuteError::MissingRole(FileRole::YTrain))?,
            x_test: take(FileRole::XTest),
            y_test: take(FileRole::YTest),
        })
    }
}

/// Persist progress updates until the engine drops its sender
async fn record_progress(pool: PgPool, job_id: Uuid, mut rx: mpsc::UnboundedReceiver<ProgressUpdate>) {
    while let Some(mut update) = rx.recv().await {
        // keep only the latest of a burst
        while let Ok(next) = rx.try_recv() {
            update = ProgressUpdate {
                best_fit: next.best_fit.or(update.best_fit),
                ..next
            };
        }

        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET generation = $2, best_fit = COALESCE($3, best_fit), updated_at = NOW()
            WHERE id = $1 AND status = 'running'
            "#,
        )
        .bind(job_id)
        .bind(update.generation)
        .bind(update.best_fit)
        .execute(&pool)
        .await;

        if let Err(e) = result {
            warn!(job_id = %job_id, error = %e, "Could not record progress");
        }
    }
}

/// Per-job directory under the configured work root
pub fn work_dir_for(config: &EngineConfig, job_id: Uuid) -> PathBuf {
    config.work_dir.join(job_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ResultBundle;
    use crate::features::analysis::commands::submit::{self, SubmitRunCommand};
    use crate::features::shared::test_helpers::{local_storage, TestDataset, TestFile, TestJob, TestProject};
    use async_trait::async_trait;
    use serde_json::json;
    use tempfile::TempDir;
    use tokio::sync::mpsc::UnboundedSender;

    /// Emits fixed progress, then succeeds or fails
    struct ScriptedEngine {
        progress: Vec<ProgressUpdate>,
        outcome: Result<serde_json::Value, String>,
    }

    #[async_trait]
    impl Engine for ScriptedEngine {
        async fn run(
            &self,
            invocation: &EngineInvocation,
            progress: UnboundedSender<ProgressUpdate>,
        ) -> Result<ResultBundle, EngineError> {
            assert!(invocation.data.x_train.exists());
            assert!(invocation.data.y_train.exists());
            invocation.write_parameter_file().await?;
            for update in &self.progress {
                let _ = progress.send(*update);
            }
            match &self.outcome {
                Ok(bundle) => Ok(ResultBundle(bundle.clone())),
                Err(stderr) => Err(EngineError::Exited {
                    code: Some(1),
                    stderr_tail: stderr.clone(),
                }),
            }
        }
    }

    struct Fixture {
        _storage_dir: TempDir,
        work_dir: TempDir,
        storage: Storage,
        project: Uuid,
    }

    async fn fixture(pool: &PgPool) -> sqlx::Result<Fixture> {
        let (storage_dir, storage) = local_storage().await;
        let project = TestProject::new("p").insert(pool).await?;
        let dataset = TestDataset::new("d").insert(pool).await?;
        TestProject::assign(pool, project, dataset).await?;
        TestFile::matrix(dataset).store(pool, &storage).await?;
        TestFile::labels(dataset).store(pool, &storage).await?;
        Ok(Fixture {
            _storage_dir: storage_dir,
            work_dir: tempfile::tempdir().expect("work dir"),
            storage,
            project,
        })
    }

    fn orchestrator(pool: &PgPool, fx: &Fixture, engine: ScriptedEngine, keep: bool) -> Orchestrator {
        let config = EngineConfig {
            work_dir: fx.work_dir.path().to_path_buf(),
            keep_work_dir: keep,
            ..EngineConfig::default()
        };
        Orchestrator::new(pool.clone(), fx.storage.clone(), Arc::new(engine), config)
    }

    async fn submit(pool: &PgPool, project: Uuid) -> Uuid {
        submit::handle(
            pool.clone(),
            SubmitRunCommand {
                project_id: project,
                config: json!({"ga": {"max_epochs": 10}}),
                files: Vec::new(),
            },
        )
        .await
        .unwrap()
        .job_id
    }

    async fn load(pool: &PgPool, job_id: Uuid) -> Job {
        sqlx::query_as::<_, Job>(&format!("SELECT {} FROM jobs WHERE id = $1", JOB_COLUMNS))
            .bind(job_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test]
    async fn test_successful_run_completes_job(pool: PgPool) -> sqlx::Result<()> {
        let fx = fixture(&pool).await?;
        let engine = ScriptedEngine {
            progress: vec![
                ProgressUpdate { generation: 4, best_fit: Some(0.7) },
                ProgressUpdate { generation: 10, best_fit: None },
            ],
            outcome: Ok(json!({"best_model": {"auc": 0.81, "features": ["msp_0001"]}})),
        };
        let orchestrator = orchestrator(&pool, &fx, engine, false);
        let job_id = submit(&pool, fx.project).await;

        orchestrator.spawn(job_id).await.unwrap();

        let job = load(&pool, job_id).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.generation, 10);
        assert_eq!(job.best_fit, Some(0.7));
        assert!(job.started_at.is_some() && job.completed_at.is_some());

        let key = job.result_key.unwrap();
        assert_eq!(key, Storage::result_key(fx.project, job_id));
        let stored: serde_json::Value =
            serde_json::from_slice(&fx.storage.download(&key).await.unwrap()).unwrap();
        assert_eq!(stored["best_model"]["auc"], 0.81);

        assert!(!work_dir_for(&orchestrator.config, job_id).exists());
        Ok(())
    }

    #[sqlx::test]
    async fn test_engine_failure_recorded_on_job(pool: PgPool) -> sqlx::Result<()> {
        let fx = fixture(&pool).await?;
        let engine = ScriptedEngine {
            progress: vec![ProgressUpdate { generation: 2, best_fit: None }],
            outcome: Err("y has a single class".to_string()),
        };
        let orchestrator = orchestrator(&pool, &fx, engine, true);
        let job_id = submit(&pool, fx.project).await;

        orchestrator.execute(job_id).await;

        let job = load(&pool, job_id).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error_message.unwrap().contains("single class"));
        assert!(job.result_key.is_none());

        let work_dir = work_dir_for(&orchestrator.config, job_id);
        assert!(work_dir.join("param.yaml").exists());
        assert!(work_dir.join("xtrain_X_train.tsv").exists());
        Ok(())
    }

    #[sqlx::test]
    async fn test_terminal_job_is_not_rerun(pool: PgPool) -> sqlx::Result<()> {
        let fx = fixture(&pool).await?;
        let engine = ScriptedEngine {
            progress: Vec::new(),
            outcome: Ok(json!({})),
        };
        let orchestrator = orchestrator(&pool, &fx, engine, false);
        let job_id = TestJob::new(fx.project)
            .with_status(JobStatus::Failed)
            .with_error("earlier failure")
            .insert(&pool)
            .await?;

        orchestrator.execute(job_id).await;

        let job = load(&pool, job_id).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some("earlier failure"));
        Ok(())
    }

    #[sqlx::test]
    async fn test_deleted_input_fails_job(pool: PgPool) -> sqlx::Result<()> {
        let fx = fixture(&pool).await?;
        let engine = ScriptedEngine {
            progress: Vec::new(),
            outcome: Ok(json!({})),
        };
        let orchestrator = orchestrator(&pool, &fx, engine, false);
        let job_id = submit(&pool, fx.project).await;
        sqlx::query("DELETE FROM dataset_files WHERE role = 'ytrain'")
            .execute(&pool)
            .await?;

        orchestrator.execute(job_id).await;

        let job = load(&pool, job_id).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error_message.unwrap().contains("no longer exists"));
        Ok(())
    }

    #[sqlx::test]
    async fn test_status_trigger_rejects_regression(pool: PgPool) -> sqlx::Result<()> {
        let project = TestProject::new("p").insert(&pool).await?;
        let job_id = TestJob::new(project)
            .with_status(JobStatus::Completed)
            .with_result_key("results/r.json")
            .insert(&pool)
            .await?;

        for status in ["pending", "running", "failed"] {
            let err = sqlx::query("UPDATE jobs SET status = $2 WHERE id = $1")
                .bind(job_id)
                .bind(status)
                .execute(&pool)
                .await
                .unwrap_err();
            assert!(crate::features::shared::error_helpers::is_check_violation(&err));
        }

        let running = TestJob::new(project).with_status(JobStatus::Running).insert(&pool).await?;
        let err = sqlx::query("UPDATE jobs SET status = 'pending' WHERE id = $1")
            .bind(running)
            .execute(&pool)
            .await
            .unwrap_err();
        assert!(crate::features::shared::error_helpers::is_check_violation(&err));
        Ok(())
    }

    #[test]
    fn test_truncate_message() {
        assert_eq!(truncate_message("short"), "short");
        let long = "x".repeat(MAX_ERROR_MESSAGE_CHARS + 10);
        assert_eq!(truncate_message(&long).chars().count(), MAX_ERROR_MESSAGE_CHARS + 3);
    }
}
