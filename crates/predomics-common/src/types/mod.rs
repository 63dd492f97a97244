//! Domain types shared by the server and its tests

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::CommonError;

// ============================================================================
// File Roles
// ============================================================================

/// Designated purpose of an uploaded file within an analysis launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FileRole {
    /// Training feature matrix
    #[serde(alias = "x_train")]
    XTrain,
    /// Training labels
    #[serde(alias = "y_train")]
    YTrain,
    /// Test feature matrix
    #[serde(alias = "x_test")]
    XTest,
    /// Test labels
    #[serde(alias = "y_test")]
    YTest,
    /// Not yet tagged
    #[default]
    Unassigned,
}

impl FileRole {
    /// Roles that can be bound to a launch, in parameter-file order.
    pub const LAUNCH_ROLES: [FileRole; 4] =
        [FileRole::XTrain, FileRole::YTrain, FileRole::XTest, FileRole::YTest];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileRole::XTrain => "xtrain",
            FileRole::YTrain => "ytrain",
            FileRole::XTest => "xtest",
            FileRole::YTest => "ytest",
            FileRole::Unassigned => "unassigned",
        }
    }

    /// Whether files with this role hold a feature matrix (as opposed to labels)
    pub fn is_matrix(&self) -> bool {
        matches!(self, FileRole::XTrain | FileRole::XTest | FileRole::Unassigned)
    }

    /// Whether files with this role hold a label vector
    pub fn is_labels(&self) -> bool {
        matches!(self, FileRole::YTrain | FileRole::YTest)
    }

    /// Key used for this role in the engine parameter file (`X`, `y`, `Xtest`, `ytest`)
    pub fn param_key(&self) -> Option<&'static str> {
        match self {
            FileRole::XTrain => Some("X"),
            FileRole::YTrain => Some("y"),
            FileRole::XTest => Some("Xtest"),
            FileRole::YTest => Some("ytest"),
            FileRole::Unassigned => None,
        }
    }
}

impl FromStr for FileRole {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xtrain" | "x_train" => Ok(FileRole::XTrain),
            "ytrain" | "y_train" => Ok(FileRole::YTrain),
            "xtest" | "x_test" => Ok(FileRole::XTest),
            "ytest" | "y_test" => Ok(FileRole::YTest),
            "unassigned" | "" => Ok(FileRole::Unassigned),
            other => Err(CommonError::InvalidRole(other.to_string())),
        }
    }
}

impl TryFrom<String> for FileRole {
    type Error = CommonError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Display for FileRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Job Status
// ============================================================================

/// Lifecycle state of an analysis job.
///
/// Transitions only move forward: `pending -> running -> {completed, failed}`,
/// plus `pending -> failed` when the engine could not be launched at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] =
        [JobStatus::Pending, JobStatus::Running, JobStatus::Completed, JobStatus::Failed];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Position in the lifecycle; terminal states share the last rank.
    pub fn rank(&self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Running => 1,
            JobStatus::Completed | JobStatus::Failed => 2,
        }
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Pending, JobStatus::Failed)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }

    /// States from which `next` may be entered.
    pub fn predecessors(next: JobStatus) -> Vec<JobStatus> {
        JobStatus::ALL
            .into_iter()
            .filter(|from| from.can_transition_to(next))
            .collect()
    }

    /// Validate a transition, returning the new state.
    pub fn transition(self, next: JobStatus) -> Result<JobStatus, CommonError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CommonError::IllegalTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl FromStr for JobStatus {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(CommonError::InvalidStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for JobStatus {
    type Error = CommonError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
