//! HTTP surface: the health probe plus every feature under `/api`

pub mod response;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower_http::compression::CompressionLayer;

use crate::config::Config;
use crate::db;
use crate::error::ServerResult;
use crate::features::{self, FeatureState};
use crate::middleware;

/// Build the application router with its middleware stack
pub fn create_router(state: FeatureState, config: &Config) -> Router {
    let health = Router::new()
        .route("/health", get(health_check))
        .with_state(state.db.clone());

    let max_upload_bytes = state.max_upload_bytes;

    Router::new()
        .merge(health)
        .nest("/api", features::router(state))
        // replaces axum's 2 MB default
        .layer(middleware::body_limit_layer(max_upload_bytes))
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

async fn health_check(State(pool): State<PgPool>) -> ServerResult<Json<Value>> {
    db::health_check(&pool).await?;
    Ok(Json(json!({
        "status": "healthy",
        "database": "connected",
        "version": env!("CARGO_PKG_VERSION"),
    })))
}
