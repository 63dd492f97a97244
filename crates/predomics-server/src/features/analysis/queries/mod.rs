pub mod get_result;
pub mod get_status;
pub mod list;

pub use get_result::{GetJobResultError, GetJobResultQuery};
pub use get_status::{GetJobStatusError, GetJobStatusQuery};
pub use list::{ListJobsError, ListJobsQuery};
