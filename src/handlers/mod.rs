// Handlers module
// HTTP handlers for the lab service

pub mod health;
pub mod probe;

pub use health::health_check;
pub use probe::probe_database;
