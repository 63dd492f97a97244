pub mod assign;
pub mod create;
pub mod delete;
pub mod delete_file;
pub mod set_role;
pub mod unassign;
pub mod update;
pub mod upload;

pub use assign::{AssignDatasetCommand, AssignDatasetError, AssignDatasetResponse};
pub use create::{CreateDatasetCommand, CreateDatasetError};
pub use delete::{DeleteDatasetCommand, DeleteDatasetError, DeleteDatasetResponse};
pub use delete_file::{DeleteFileCommand, DeleteFileError, DeleteFileResponse};
pub use set_role::{SetFileRoleCommand, SetFileRoleError};
pub use unassign::{UnassignDatasetCommand, UnassignDatasetError, UnassignDatasetResponse};
pub use update::{UpdateDatasetCommand, UpdateDatasetError};
pub use upload::{UploadFileCommand, UploadFileError, UploadTarget};
