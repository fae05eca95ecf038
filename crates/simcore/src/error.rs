//! Simulation error taxonomy.

use thiserror::Error;

/// Errors surfaced by the simulation core.
///
/// `Cancelled` is expected control flow: it is raised at suspension points
/// when a run is aborted and swallowed silently at the engine boundary.
/// Everything else is a genuine failure that terminates the current run.
#[derive(Debug, Error)]
pub enum SimError {
    /// The run was deliberately aborted (reset, stop, or a newer run).
    #[error("simulation aborted")]
    Cancelled,

    /// A user-authored program misbehaved at runtime.
    #[error("script error: {0}")]
    Script(String),

    /// Persisted data failed to parse at a load boundary.
    #[error("malformed data: {0}")]
    BadData(#[from] serde_json::Error),
}

impl SimError {
    /// Whether this error is the silent cancellation signal.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SimError::Cancelled)
    }
}
