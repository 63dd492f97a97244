//! Mediator wiring
//!
//! Routes and the orchestrator call the feature handlers directly.
//! `build_mediator` registers the same handlers behind one
//! `DefaultAsyncMediator` for embedding the server as a library.

pub use mediator::DefaultAsyncMediator;
use sqlx::PgPool;

use crate::storage::Storage;

pub mod middleware;

pub type AppMediator = DefaultAsyncMediator;

pub fn build_mediator(pool: PgPool, storage: Storage) -> AppMediator {
    DefaultAsyncMediator::builder()
        // Users
        .add_handler({
            let pool = pool.clone();
            move |cmd| {
                let pool = pool.clone();
                async move { crate::features::users::commands::create::handle(pool, cmd).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |query| {
                let pool = pool.clone();
                async move { crate::features::users::queries::get::handle(pool, query).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |query| {
                let pool = pool.clone();
                async move { crate::features::users::queries::list::handle(pool, query).await }
            }
        })
        // Projects
        .add_handler({
            let pool = pool.clone();
            move |cmd| {
                let pool = pool.clone();
                async move { crate::features::projects::commands::create::handle(pool, cmd).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |cmd| {
                let pool = pool.clone();
                async move { crate::features::projects::commands::update::handle(pool, cmd).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            let storage = storage.clone();
            move |cmd| {
                let pool = pool.clone();
                let storage = storage.clone();
                async move { crate::features::projects::commands::delete::handle(pool, storage, cmd).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |query| {
                let pool = pool.clone();
                async move { crate::features::projects::queries::get::handle(pool, query).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |query| {
                let pool = pool.clone();
                async move { crate::features::projects::queries::list::handle(pool, query).await }
            }
        })
        // Datasets
        .add_handler({
            let pool = pool.clone();
            move |cmd| {
                let pool = pool.clone();
                async move { crate::features::datasets::commands::create::handle(pool, cmd).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |cmd| {
                let pool = pool.clone();
                async move { crate::features::datasets::commands::update::handle(pool, cmd).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            let storage = storage.clone();
            move |cmd| {
                let pool = pool.clone();
                let storage = storage.clone();
                async move { crate::features::datasets::commands::delete::handle(pool, storage, cmd).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            let storage = storage.clone();
            move |cmd| {
                let pool = pool.clone();
                let storage = storage.clone();
                async move { crate::features::datasets::commands::upload::handle(pool, storage, cmd).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |cmd| {
                let pool = pool.clone();
                async move { crate::features::datasets::commands::assign::handle(pool, cmd).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |cmd| {
                let pool = pool.clone();
                async move { crate::features::datasets::commands::unassign::handle(pool, cmd).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            let storage = storage.clone();
            move |cmd| {
                let pool = pool.clone();
                let storage = storage.clone();
                async move { crate::features::datasets::commands::set_role::handle(pool, storage, cmd).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            let storage = storage.clone();
            move |cmd| {
                let pool = pool.clone();
                let storage = storage.clone();
                async move { crate::features::datasets::commands::delete_file::handle(pool, storage, cmd).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |query| {
                let pool = pool.clone();
                async move { crate::features::datasets::queries::get::handle(pool, query).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |query| {
                let pool = pool.clone();
                async move { crate::features::datasets::queries::list::handle(pool, query).await }
            }
        })
        // Analysis
        .add_handler({
            let pool = pool.clone();
            move |cmd| {
                let pool = pool.clone();
                async move { crate::features::analysis::commands::submit::handle(pool, cmd).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |cmd| {
                let pool = pool.clone();
                async move { crate::features::analysis::commands::recover::handle(pool, cmd).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |query| {
                let pool = pool.clone();
                async move { crate::features::analysis::queries::get_status::handle(pool, query).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            let storage = storage.clone();
            move |query| {
                let pool = pool.clone();
                let storage = storage.clone();
                async move { crate::features::analysis::queries::get_result::handle(pool, storage, query).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |query| {
                let pool = pool.clone();
                async move { crate::features::analysis::queries::list::handle(pool, query).await }
            }
        })
        // Shares
        .add_handler({
            let pool = pool.clone();
            move |cmd| {
                let pool = pool.clone();
                async move { crate::features::shares::commands::create::handle(pool, cmd).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |cmd| {
                let pool = pool.clone();
                async move { crate::features::shares::commands::revoke::handle(pool, cmd).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |query| {
                let pool = pool.clone();
                async move { crate::features::shares::queries::list::handle(pool, query).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |query| {
                let pool = pool.clone();
                async move { crate::features::shares::queries::resolve::handle(pool, query).await }
            }
        })
        .build()
}
