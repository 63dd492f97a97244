//! Feature slices of the Predomics API
//!
//! Each slice owns its commands (writes), queries (reads), routes and
//! types, following the CQRS layout. Handlers are plain async functions;
//! the [`crate::cqrs`] mediator registers the same functions.
//!
//! # Features
//!
//! - **users**: accounts
//! - **projects**: projects with their class labels
//! - **datasets**: datasets, file uploads and role tagging, project assignment
//! - **analysis**: job submission, orchestration and results
//! - **shares**: share links and public read-only access

pub mod analysis;
pub mod datasets;
pub mod projects;
pub mod shared;
pub mod shares;
pub mod users;

use axum::Router;

use crate::storage::Storage;
use analysis::Orchestrator;

/// Shared state for the feature routes that need more than the pool
#[derive(Clone)]
pub struct FeatureState {
    pub db: sqlx::PgPool,
    pub storage: Storage,
    /// Launches submitted jobs in the background
    pub orchestrator: Orchestrator,
    /// Largest accepted uploaded file
    pub max_upload_bytes: usize,
}

/// Mounts every feature under its path prefix:
/// `/users`, `/projects`, `/datasets`, `/analysis`, `/shares`, `/public`
pub fn router(state: FeatureState) -> Router<()> {
    let projects = projects::projects_routes()
        .merge(datasets::project_dataset_routes())
        .with_state(state.clone())
        .merge(shares::project_share_routes().with_state(state.db.clone()));

    Router::new()
        .nest("/users", users::users_routes().with_state(state.db.clone()))
        .nest("/projects", projects)
        .nest("/datasets", datasets::datasets_routes().with_state(state.clone()))
        .nest("/analysis", analysis::analysis_routes().with_state(state.clone()))
        .nest("/shares", shares::shares_routes().with_state(state.db.clone()))
        .nest("/public", shares::public_routes().with_state(state.db))
}
