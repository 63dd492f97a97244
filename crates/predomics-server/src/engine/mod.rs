//! Adapter around the external gpredomics engine
//!
//! The engine is opaque: it receives a parameter file and the role-tagged
//! data files, prints progress on stdout and leaves a JSON result bundle
//! behind. [`Engine`] is the seam the orchestrator talks to; production uses
//! [`process::ProcessEngine`].

pub mod config;
pub mod process;
pub mod progress;

use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

pub use config::RunConfig;
pub use process::ProcessEngine;
pub use progress::{ProgressParser, ProgressUpdate};

/// Name of the parameter file written into each work directory
pub const PARAM_FILE_NAME: &str = "param.yaml";

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to launch engine '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Engine I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Engine exited with status {code:?}: {stderr_tail}")]
    Exited { code: Option<i32>, stderr_tail: String },

    #[error("Engine finished but produced no result file at {0}")]
    MissingResult(PathBuf),

    #[error("Engine result is not valid JSON: {0}")]
    InvalidResult(#[from] serde_json::Error),
}

/// Data file paths bound to engine roles
#[derive(Debug, Clone, Serialize)]
pub struct DataPaths {
    #[serde(rename = "X")]
    pub x_train: PathBuf,
    #[serde(rename = "y")]
    pub y_train: PathBuf,
    #[serde(rename = "Xtest", skip_serializing_if = "Option::is_none")]
    pub x_test: Option<PathBuf>,
    #[serde(rename = "ytest", skip_serializing_if = "Option::is_none")]
    pub y_test: Option<PathBuf>,
}

/// Everything needed for a single engine run
#[derive(Debug, Clone)]
pub struct EngineInvocation {
    pub job_id: Uuid,
    pub config: RunConfig,
    pub data: DataPaths,
    pub work_dir: PathBuf,
}

impl EngineInvocation {
    pub fn param_path(&self) -> PathBuf {
        self.work_dir.join(PARAM_FILE_NAME)
    }

    /// Parameter document handed to the engine: the run config with the
    /// data section extended by the file paths.
    pub fn parameter_document(&self) -> Result<serde_json::Value, serde_json::Error> {
        let mut doc = serde_json::to_value(&self.config)?;
        let paths = serde_json::to_value(&self.data)?;
        if let (Some(section), serde_json::Value::Object(paths)) =
            (doc.get_mut("data").and_then(|d| d.as_object_mut()), paths)
        {
            section.extend(paths);
        }
        Ok(doc)
    }

    /// Write the parameter file. JSON is a YAML subset, so the engine's YAML
    /// reader accepts it.
    pub async fn write_parameter_file(&self) -> Result<PathBuf, EngineError> {
        let path = self.param_path();
        let body = serde_json::to_vec_pretty(&self.parameter_document()?)?;
        tokio::fs::write(&path, body).await?;
        Ok(path)
    }
}

/// The opaque result document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultBundle(pub serde_json::Value);

/// Runs a model search to completion.
///
/// Progress updates are best effort; implementations drop them silently if
/// the receiver is gone.
#[async_trait]
pub trait Engine: Send + Sync {
    async fn run(
        &self,
        invocation: &EngineInvocation,
        progress: UnboundedSender<ProgressUpdate>,
    ) -> Result<ResultBundle, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_document_merges_paths_into_data() {
        let invocation = EngineInvocation {
            job_id: Uuid::nil(),
            config: RunConfig::default(),
            data: DataPaths {
                x_train: PathBuf::from("/w/X_train.tsv"),
                y_train: PathBuf::from("/w/y_train.tsv"),
                x_test: None,
                y_test: None,
            },
            work_dir: PathBuf::from("/w"),
        };

        let doc = invocation.parameter_document().unwrap();
        assert_eq!(doc["data"]["X"], "/w/X_train.tsv");
        assert_eq!(doc["data"]["y"], "/w/y_train.tsv");
        assert!(doc["data"].get("Xtest").is_none());
        assert_eq!(doc["data"]["feature_maximal_pvalue"], 0.5);
        assert_eq!(doc["general"]["algo"], "ga");
        assert_eq!(invocation.param_path(), PathBuf::from("/w/param.yaml"));
    }
}
