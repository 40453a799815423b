//! Simulation error types.
//!
//! The taxonomy separates failures that abort a run from conditions the
//! engine absorbs by design:
//!
//! - **Configuration and topology errors** reject a run at setup, before any
//!   round executes. No partial simulation is ever produced.
//! - **Invariant violations** (negative weight, mass non-conservation) are
//!   engine defects and abort the run when detected.
//! - Transient protocol conditions, such as a missed mailbox delivery or a
//!   zero-weight estimate, are *not* errors. They are expected outcomes of
//!   fault injection and take defined fallbacks (no-op / `0.0`) instead.

use thiserror::Error;

/// Simulation errors.
#[derive(Error, Debug)]
pub enum SimError {
    /// Invalid configuration rejected at setup.
    #[error("Config error: {0}")]
    Config(String),

    /// Topology provider failed to produce a connected graph within its
    /// retry budget.
    #[error("Topology error: {0}")]
    Topology(String),

    /// Internal consistency check failed: an engine defect, never a
    /// fault-injection outcome.
    #[error("Invariant violated: {0}")]
    Invariant(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for simulation operations
pub type Result<T> = std::result::Result<T, SimError>;

impl From<toml::de::Error> for SimError {
    fn from(err: toml::de::Error) -> Self {
        SimError::Config(err.to_string())
    }
}
