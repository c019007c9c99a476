//! Batch orchestration.
//!
//! Records are normalized up front, looked up with bounded concurrency, and
//! written back into their input slot, so output order never depends on
//! completion order. A failed record never aborts the batch.

use futures_util::stream::{self, StreamExt};
use hja_core::{normalize, BatchResult, LookupResult, NormalizedRecord, RawRecord, RecordBatch};
use hja_registry::LookupClient;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::cancel::Cancellation;
use crate::error::ReconcileError;
use crate::retry::RetryPolicy;

/// In-flight lookups per batch when none is configured.
pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Upper bound on concurrent registry lookups. `0` is treated as `1`.
    pub concurrency: usize,
    pub retry: RetryPolicy,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            retry: RetryPolicy::default(),
        }
    }
}

/// Progress emitted by [`Orchestrator::reconcile_streaming`].
///
/// `Record` events arrive in completion order; `index` is the record's
/// position in the input. `Finished` is always last.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReconcileEvent {
    Record {
        index: usize,
        completed: usize,
        total: usize,
        result: LookupResult,
    },
    Finished(BatchResult),
}

pub struct Orchestrator {
    lookup: LookupClient,
    options: ReconcileOptions,
}

impl Orchestrator {
    pub fn new(lookup: LookupClient, options: ReconcileOptions) -> Self {
        Self { lookup, options }
    }

    pub fn lookup_client(&self) -> &LookupClient {
        &self.lookup
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Single on-demand check, with the same retry policy as a batch.
    pub async fn lookup_one(&self, record: &RawRecord) -> LookupResult {
        self.lookup_with_retry(&normalize(record), &Cancellation::never())
            .await
    }

    pub async fn reconcile(&self, records: &[RawRecord]) -> Result<BatchResult, ReconcileError> {
        self.run(records, &Cancellation::never(), None).await
    }

    /// Records not yet started when `cancel` fires come back `CANCELLED`.
    pub async fn reconcile_with_cancel(
        &self,
        records: &[RawRecord],
        cancel: &Cancellation,
    ) -> Result<BatchResult, ReconcileError> {
        self.run(records, cancel, None).await
    }

    /// Like [`Self::reconcile_with_cancel`], also reporting each result on
    /// `events` as it completes. A dropped receiver cancels the remainder.
    ///
    /// Returns as soon as every record has resolved; events still queued for
    /// a slow receiver keep being delivered, `Finished` last.
    pub async fn reconcile_streaming(
        &self,
        records: &[RawRecord],
        cancel: &Cancellation,
        events: mpsc::Sender<ReconcileEvent>,
    ) -> Result<BatchResult, ReconcileError> {
        self.run(records, cancel, Some(&events)).await
    }

    /// Reconcile a decoded upload.
    pub async fn reconcile_batch(&self, batch: &RecordBatch) -> Result<BatchResult, ReconcileError> {
        info!(
            filename = %batch.metadata.filename,
            encoding = %batch.metadata.encoding,
            row_count = batch.metadata.row_count,
            "reconciling upload"
        );
        if batch.metadata.row_count != batch.records.len() {
            warn!(
                declared = batch.metadata.row_count,
                actual = batch.records.len(),
                "upload row_count disagrees with decoded records"
            );
        }
        self.reconcile(&batch.records).await
    }

    // -----------------------------------------------------------------------
    // internals
    // -----------------------------------------------------------------------

    async fn run(
        &self,
        records: &[RawRecord],
        cancel: &Cancellation,
        events: Option<&mpsc::Sender<ReconcileEvent>>,
    ) -> Result<BatchResult, ReconcileError> {
        if records.is_empty() {
            return Err(ReconcileError::EmptyBatch);
        }

        let normalized: Vec<NormalizedRecord> = records.iter().map(normalize).collect();

        if normalized.iter().any(|r| r.number.is_valid()) {
            if let Err(e) = self.lookup.registry().ready().await {
                warn!(registry = self.lookup.registry().name(), error = %e, "registry preflight failed");
                return Err(ReconcileError::RegistryUnavailable(e));
            }
        }

        let batch_id = Uuid::new_v4();
        let span = info_span!("reconcile", %batch_id, total = normalized.len());
        let forwarder = events.map(|tx| EventForwarder::spawn(tx.clone()));
        let batch = self
            .run_records(&normalized, cancel, forwarder.as_ref())
            .instrument(span.clone())
            .await;

        span.in_scope(|| {
            info!(
                total = batch.total_count(),
                success = batch.success_count(),
                errors = batch.error_count(),
                cancelled = batch.count_of(hja_core::MatchStatus::Cancelled),
                "reconcile finished"
            );
        });

        if let Some(forwarder) = forwarder {
            forwarder.push(ReconcileEvent::Finished(batch.clone()));
        }
        Ok(batch)
    }

    async fn run_records<'r>(
        &self,
        normalized: &'r [NormalizedRecord],
        cancel: &Cancellation,
        events: Option<&EventForwarder>,
    ) -> BatchResult {
        let total = normalized.len();
        let concurrency = self.options.concurrency.max(1);
        let stopped = || cancel.is_cancelled() || events.is_some_and(EventForwarder::is_closed);

        let mut slots: Vec<Option<LookupResult>> = vec![None; total];
        let mut completed = 0usize;

        let mut in_flight = stream::iter(normalized.iter().enumerate())
            .map(|(index, record): (usize, &'r NormalizedRecord)| async move {
                if stopped() {
                    return (index, LookupResult::cancelled(record));
                }
                (index, self.lookup_with_retry(record, cancel).await)
            })
            .buffer_unordered(concurrency)
            .boxed();

        while let Some((index, result)) = in_flight.next().await {
            completed += 1;
            debug!(index, completed, total, status = result.status().as_str(), "record done");
            if let Some(forwarder) = events {
                forwarder.push(ReconcileEvent::Record {
                    index,
                    completed,
                    total,
                    result: result.clone(),
                });
            }
            slots[index] = Some(result);
        }

        let results = slots
            .into_iter()
            .zip(normalized)
            .map(|(slot, record)| slot.unwrap_or_else(|| LookupResult::cancelled(record)))
            .collect();
        BatchResult::from_results(results)
    }

    /// Retry `ERROR` outcomes with backoff. Cancellation during a backoff
    /// keeps the last outcome.
    async fn lookup_with_retry(
        &self,
        record: &NormalizedRecord,
        cancel: &Cancellation,
    ) -> LookupResult {
        let policy = self.options.retry;
        let mut result = self.lookup.lookup(record).await;
        let mut retry = 0;

        while result.status().is_retryable() && retry < policy.max_retries() {
            retry += 1;
            let delay = policy.backoff_for(retry);
            debug!(
                number = result.corporate_number(),
                retry,
                delay_ms = delay.as_millis() as u64,
                "retrying lookup"
            );

            let mut cancelled = cancel.clone();
            tokio::select! {
                _ = cancelled.cancelled() => return result,
                _ = tokio::time::sleep(delay) => {}
            }
            result = self.lookup.lookup(record).await;
        }
        result
    }
}

// ---------------------------------------------------------------------------
// Event delivery
// ---------------------------------------------------------------------------

/// Queues events without blocking the lookup loop; a spawned task drains
/// the queue into the caller's channel in order. In-flight lookups keep
/// being polled while a slow consumer applies backpressure.
struct EventForwarder {
    queue: mpsc::UnboundedSender<ReconcileEvent>,
    downstream: mpsc::Sender<ReconcileEvent>,
}

impl EventForwarder {
    fn spawn(downstream: mpsc::Sender<ReconcileEvent>) -> Self {
        let (queue, mut pending) = mpsc::unbounded_channel();
        let out = downstream.clone();
        tokio::spawn(async move {
            while let Some(event) = pending.recv().await {
                if out.send(event).await.is_err() {
                    debug!("event receiver dropped");
                    break;
                }
            }
        });
        Self { queue, downstream }
    }

    fn is_closed(&self) -> bool {
        self.downstream.is_closed()
    }

    fn push(&self, event: ReconcileEvent) {
        // Fails only once the forwarding task has seen a closed receiver.
        let _ = self.queue.send(event);
    }
}
