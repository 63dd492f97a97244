pub mod get;
pub mod list;

pub use get::{DatasetDetail, GetDatasetError, GetDatasetQuery};
pub use list::{DatasetSummary, ListDatasetsError, ListDatasetsQuery};
