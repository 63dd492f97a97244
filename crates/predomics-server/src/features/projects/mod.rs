//! Projects
//!
//! A project groups the datasets an analysis draws from, the class labels
//! of the outcome, and the jobs launched against it.

pub mod commands;
pub mod queries;
pub mod routes;
pub mod types;

pub use commands::{CreateProjectCommand, DeleteProjectCommand, UpdateProjectCommand};
pub use queries::{GetProjectQuery, ListProjectsQuery, ProjectSummary};
pub use routes::projects_routes;
pub use types::{Project, ProjectDetail};
