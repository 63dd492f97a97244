//! Predomics Server Library
//!
//! REST backend for the Predomics web application: users, projects,
//! datasets with role-tagged files, analysis jobs run through the
//! gpredomics engine, and share links.
//!
//! # Architecture
//!
//! The server follows a **CQRS** layout of vertical feature slices
//! ([`features`]). Commands change state, queries read it; both are plain
//! async handlers over a [`sqlx::PgPool`], also registered with the
//! [`cqrs`] mediator.
//!
//! - **Storage**: uploaded files and result bundles live in an object store
//!   ([`storage`]), local filesystem or S3-compatible.
//! - **Engine**: [`engine`] wraps the external model search binary;
//!   [`features::analysis::Orchestrator`] runs one background task per job.
//! - **Jobs** move forward only: `pending -> running -> completed|failed`.
//!
//! # Example
//!
//! ```no_run
//! use predomics_server::{config::Config, db};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let pool = db::create_pool(&config.database).await?;
//!     db::migrate(&pool).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod cqrs;
pub mod db;
pub mod engine;
pub mod error;
pub mod features;
pub mod middleware;
pub mod storage;

pub use error::{AppError, ServerResult};
