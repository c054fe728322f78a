// Library root for the compose lab web service

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;

// Re-export commonly used types
pub use app::{create_router, AppState};
pub use config::{Config, DatabaseParams, EnvSource, ProcessEnv, StaticEnv};
pub use db::{ConnectionTracker, Connector, PostgresConnector};
pub use error::ProbeError;
pub use models::{HealthReport, ProbeOutcome};
