//! Predomics Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the predomics workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`CommonError`] and the [`Result`] alias
//! - **Logging**: tracing subscriber setup shared by every binary
//! - **Types**: file roles and the job status state machine
//! - **Tabular**: best-effort statistics for uploaded TSV/CSV files
//!
//! # Example
//!
//! ```no_run
//! use predomics_common::tabular::inspect;
//! use predomics_common::types::FileRole;
//!
//! let bytes = b"feature\ts1\ts2\nmsp_1\t0.1\t0.0\n";
//! let stats = inspect(bytes, FileRole::XTrain).unwrap();
//! assert_eq!(stats.n_features, Some(1));
//! assert_eq!(stats.n_samples, Some(2));
//! ```

pub mod checksum;
pub mod error;
pub mod logging;
pub mod tabular;
pub mod types;

// Re-export commonly used types
pub use error::{CommonError, Result};
