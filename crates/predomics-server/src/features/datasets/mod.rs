//! Dataset registry
//!
//! A dataset is a named group of role-tagged files (feature matrices and
//! label vectors). Groups live independently of projects and are attached
//! to them through `project_datasets`; deleting a project never deletes a
//! group. File bytes go to object storage, statistics to the database.

pub mod commands;
pub mod queries;
pub mod routes;
pub mod types;

pub use commands::{
    AssignDatasetCommand, CreateDatasetCommand, DeleteDatasetCommand, DeleteFileCommand,
    SetFileRoleCommand, UnassignDatasetCommand, UpdateDatasetCommand, UploadFileCommand, UploadTarget,
};
pub use queries::{DatasetDetail, DatasetSummary, GetDatasetQuery, ListDatasetsQuery};
pub use routes::{datasets_routes, project_dataset_routes};
pub use types::{Dataset, DatasetFile, DatasetWithFiles};
