use std::sync::Arc;

use soot_core::SootConfig;
use sqlx::SqlitePool;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<SootConfig>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: SootConfig) -> Self {
        AppState {
            pool,
            config: Arc::new(config),
        }
    }
}
