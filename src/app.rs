use axum::{routing::get, Router};
use std::sync::Arc;

use crate::{
    config::{EnvSource, ProcessEnv},
    db::{ConnectionTracker, Connector, PostgresConnector},
    handlers::{health_check, probe_database},
    middleware::create_middleware_stack,
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub env: Arc<dyn EnvSource>,
    pub connector: Arc<dyn Connector>,
    pub tracker: ConnectionTracker,
}

impl AppState {
    pub fn new(env: Arc<dyn EnvSource>, connector: Arc<dyn Connector>) -> Self {
        AppState {
            env,
            connector,
            tracker: ConnectionTracker::new(),
        }
    }

    /// Live process environment and a real PostgreSQL connector.
    pub fn from_process() -> Self {
        Self::new(Arc::new(ProcessEnv), Arc::new(PostgresConnector::new()))
    }
}

/// Create the Axum router with all endpoints and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Database probe
        .route("/", get(probe_database))
        // Liveness endpoint
        .route("/health", get(health_check))
        .with_state(state)
        .layer(create_middleware_stack())
}
