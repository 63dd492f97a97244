//! Analysis jobs
//!
//! Submitting a run records a `pending` job; the [`orchestrator`] then
//! drives it through the engine on a background task. Clients poll the job
//! for status and progress and fetch the result bundle once it completed.

pub mod commands;
pub mod orchestrator;
pub mod queries;
pub mod routes;
pub mod types;

pub use commands::{FileRef, RecoverInterruptedJobsCommand, SubmitRunCommand};
pub use orchestrator::Orchestrator;
pub use queries::{GetJobResultQuery, GetJobStatusQuery, ListJobsQuery};
pub use routes::analysis_routes;
pub use types::{Job, JobView, Progress};
