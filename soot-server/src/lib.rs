//! HTTP service for Soot.
//!
//! [`app`] builds the router over an already migrated pool; [`serve`] opens
//! the configured database, optionally applies pending migrations and listens.

pub mod auth;
pub mod db;
pub mod logging;
pub mod routes;
pub mod state;
pub mod store;

use anyhow::{Context, Result};
use axum::Router;
use soot_core::SootConfig;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::state::AppState;

/// The full router with CORS and request tracing.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::houses::router())
        .merge(routes::important_dates::router())
        .merge(routes::tasks::router())
        .merge(routes::calendar::router())
        .merge(routes::inventory::router())
        .merge(routes::budget::router())
        .merge(routes::image_jobs::router())
        .merge(routes::manifest::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Open the database and serve until the process is stopped.
///
/// Without `migrate`, pending migrations are only reported; budget routes
/// then answer 503 until `soot migrate` has run.
pub async fn serve(config: SootConfig, migrate: bool) -> Result<()> {
    let pool = db::connect(&config.expanded_database_url()).await?;
    if migrate {
        let applied = db::migrate(&pool).await?;
        if !applied.is_empty() {
            info!(target: "soot", event = "migrations_applied", count = applied.len());
        }
    } else {
        for (name, _) in db::status(&pool).await?.into_iter().filter(|(_, applied)| !applied) {
            warn!(target: "soot", event = "migration_pending", name);
        }
    }

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!(target: "soot", event = "listening", addr = %config.bind);

    axum::serve(listener, app(AppState::new(pool, config))).await?;
    Ok(())
}
