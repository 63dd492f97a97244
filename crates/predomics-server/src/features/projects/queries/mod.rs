pub mod get;
pub mod list;

pub use get::{GetProjectError, GetProjectQuery};
pub use list::{ListProjectsError, ListProjectsQuery, ProjectSummary};
