use std::fmt;

use hja_registry::RegistryError;

/// Batch-level failures. Per-record failures never surface here; they are
/// classified into the record's result slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// The request had no records.
    EmptyBatch,
    /// The registry preflight failed before any record started.
    RegistryUnavailable(RegistryError),
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileError::EmptyBatch => write!(f, "batch contains no records"),
            ReconcileError::RegistryUnavailable(e) => write!(f, "registry unavailable: {e}"),
        }
    }
}

impl std::error::Error for ReconcileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReconcileError::EmptyBatch => None,
            ReconcileError::RegistryUnavailable(e) => Some(e),
        }
    }
}
