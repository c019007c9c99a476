//! hja-reconcile
//!
//! Batch reconciliation: every input record yields exactly one result slot,
//! in input order, regardless of how many lookups fail, time out, or are
//! cancelled.
//!
//! - [`Orchestrator::reconcile`] returns one final [`hja_core::BatchResult`].
//! - [`Orchestrator::reconcile_streaming`] additionally pushes a
//!   [`ReconcileEvent`] per resolved record.
//!
//! Lookups may complete out of order internally; results are placed by index.

mod cancel;
mod error;
mod orchestrator;
mod retry;
mod wiring;

pub use cancel::{cancellation, CancelHandle, Cancellation};
pub use error::ReconcileError;
pub use orchestrator::{Orchestrator, ReconcileEvent, ReconcileOptions, DEFAULT_CONCURRENCY};
pub use retry::{RetryPolicy, MAX_RETRIES_CAP};
pub use wiring::{build_orchestrator, nta_registry};
