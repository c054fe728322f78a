// Models module

pub mod health;
pub mod outcome;

// Re-export commonly used types
pub use health::HealthReport;
pub use outcome::ProbeOutcome;
