pub mod recover;
pub mod submit;

pub use recover::{RecoverInterruptedJobsCommand, RecoverInterruptedJobsError, RecoverInterruptedJobsResponse};
pub use submit::{FileRef, SubmitRunCommand, SubmitRunError, SubmitRunResponse};
