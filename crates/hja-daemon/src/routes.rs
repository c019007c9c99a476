//! Axum router and all HTTP handlers for hja-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Handlers are `pub(crate)`; scenario tests in `tests/`
//! compose the router directly.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use hja_core::{normalize, RawRecord, RecordBatch};
use hja_reconcile::{Cancellation, ReconcileError, ReconcileEvent};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::{
    api_types::{BulkLookupRequest, CheckInput, ErrorResponse, HealthResponse},
    state::AppState,
};

/// Buffered progress events per streaming batch.
const STREAM_BUFFER: usize = 64;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// CORS and tracing layers are **not** applied here; `main.rs` attaches them
/// so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/checks/lookup", post(checks_lookup))
        .route("/v1/checks/bulk", post(checks_bulk))
        .route("/v1/checks/bulk/stream", post(checks_bulk_stream))
        .with_state(state)
}

/// CORS restricted to exact configured origins. Unparseable entries are
/// skipped with a warning.
pub fn cors_allow_list(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o.trim()) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

// ---------------------------------------------------------------------------
// POST /v1/checks/lookup
// ---------------------------------------------------------------------------

/// Single on-demand check. A malformed number answers 200 with status
/// `MALFORMED`; only an unusable registry is an HTTP error.
pub(crate) async fn checks_lookup(
    State(st): State<Arc<AppState>>,
    body: Result<Json<CheckInput>, JsonRejection>,
) -> Response {
    let record = match body {
        Ok(Json(input)) => input.into_record(),
        Err(rej) => return invalid_request(rej),
    };

    if normalize(&record).number.is_valid() {
        if let Err(e) = st.orchestrator.lookup_client().registry().ready().await {
            return reconcile_error_response(ReconcileError::RegistryUnavailable(e));
        }
    }

    let result = st.orchestrator.lookup_one(&record).await;
    info!(status = result.status().as_str(), "checks/lookup");
    (StatusCode::OK, Json(result)).into_response()
}

// ---------------------------------------------------------------------------
// POST /v1/checks/bulk
// ---------------------------------------------------------------------------

pub(crate) async fn checks_bulk(
    State(st): State<Arc<AppState>>,
    body: Result<Json<BulkLookupRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rej) => return invalid_request(rej),
    };

    let outcome = match req.metadata {
        Some(metadata) => {
            let batch = RecordBatch {
                metadata,
                records: req.records,
            };
            st.orchestrator.reconcile_batch(&batch).await
        }
        None => st.orchestrator.reconcile(&req.records).await,
    };

    match outcome {
        Ok(batch) => {
            info!(
                total = batch.total_count(),
                success = batch.success_count(),
                errors = batch.error_count(),
                "checks/bulk"
            );
            (StatusCode::OK, Json(batch)).into_response()
        }
        Err(e) => reconcile_error_response(e),
    }
}

// ---------------------------------------------------------------------------
// POST /v1/checks/bulk/stream  (SSE)
// ---------------------------------------------------------------------------

/// Streaming batch: one `record` event per resolved record (completion
/// order, with its input `index`), then one `finished` event carrying the
/// ordered batch. Closing the connection cancels records not yet started.
pub(crate) async fn checks_bulk_stream(
    State(st): State<Arc<AppState>>,
    body: Result<Json<BulkLookupRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rej) => return invalid_request(rej),
    };

    // Batch-level failures must surface as a status code, before any event.
    if let Err(resp) = preflight(&st, &req.records).await {
        return resp;
    }

    let (tx, rx) = mpsc::channel(STREAM_BUFFER);
    let orchestrator = Arc::clone(&st.orchestrator);
    let records = req.records;
    tokio::spawn(async move {
        if let Err(e) = orchestrator
            .reconcile_streaming(&records, &Cancellation::never(), tx)
            .await
        {
            warn!(error = %e, "streaming batch failed after preflight");
        }
    });

    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));

    (headers, Sse::new(events_to_sse(rx)).keep_alive(KeepAlive::new())).into_response()
}

async fn preflight(st: &AppState, records: &[RawRecord]) -> Result<(), Response> {
    if records.is_empty() {
        return Err(reconcile_error_response(ReconcileError::EmptyBatch));
    }
    let any_valid = records.iter().any(|r| normalize(r).number.is_valid());
    if any_valid {
        if let Err(e) = st.orchestrator.lookup_client().registry().ready().await {
            return Err(reconcile_error_response(ReconcileError::RegistryUnavailable(e)));
        }
    }
    Ok(())
}

fn events_to_sse(
    rx: mpsc::Receiver<ReconcileEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    ReceiverStream::new(rx).filter_map(|ev| async move {
        let event_name = match &ev {
            ReconcileEvent::Record { .. } => "record",
            ReconcileEvent::Finished(_) => "finished",
        };
        let data = serde_json::to_string(&ev).ok()?;
        Some(Ok(Event::default().event(event_name).data(data)))
    })
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn invalid_request(rej: JsonRejection) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "INVALID_REQUEST".to_string(),
            detail: rej.body_text(),
        }),
    )
        .into_response()
}

fn reconcile_error_response(e: ReconcileError) -> Response {
    let (status, code) = match &e {
        ReconcileError::EmptyBatch => (StatusCode::BAD_REQUEST, "EMPTY_BATCH"),
        ReconcileError::RegistryUnavailable(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, "REGISTRY_UNAVAILABLE")
        }
    };
    warn!(code, error = %e, "request refused");
    (
        status,
        Json(ErrorResponse {
            error: code.to_string(),
            detail: e.to_string(),
        }),
    )
        .into_response()
}
