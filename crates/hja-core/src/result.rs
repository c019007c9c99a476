//! Reconciliation outcomes.
//!
//! [`LookupResult`] and [`BatchResult`] have private fields: once built they
//! are read-only. A correction means a new lookup, never an in-place edit.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::number::{MalformedReason, NumberCheck};
use crate::record::NormalizedRecord;

// ---------------------------------------------------------------------------
// MatchStatus
// ---------------------------------------------------------------------------

/// Classification of one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    /// Registry entry found and the normalized names agree (or no input name).
    Ok,
    /// Valid number, no registry entry.
    NotFound,
    /// Registry entry found but the names differ; needs a human.
    NeedCheck,
    /// Number failed structural validation; no lookup was made.
    Malformed,
    /// Transport failure, timeout or non-success registry response.
    Error,
    /// The batch was cancelled before this record started.
    Cancelled,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Ok => "OK",
            MatchStatus::NotFound => "NOT_FOUND",
            MatchStatus::NeedCheck => "NEED_CHECK",
            MatchStatus::Malformed => "MALFORMED",
            MatchStatus::Error => "ERROR",
            MatchStatus::Cancelled => "CANCELLED",
        }
    }

    /// A registry lookup was actually performed and answered.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            MatchStatus::Ok | MatchStatus::NotFound | MatchStatus::NeedCheck
        )
    }

    /// Only transport-level failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MatchStatus::Error)
    }
}

// ---------------------------------------------------------------------------
// LookupResult
// ---------------------------------------------------------------------------

/// One reconciliation outcome. Exactly one is produced per input record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupResult {
    corporate_number: String,
    input_name: Option<String>,
    matched_name: Option<String>,
    matched_address: Option<String>,
    status: MatchStatus,
    /// Opaque audit payload (registry body, diagnostic detail, or reason).
    raw_response: Value,
}

impl LookupResult {
    fn base(record: &NormalizedRecord, status: MatchStatus, raw_response: Value) -> Self {
        Self {
            corporate_number: record.number.display_str().to_string(),
            input_name: record.input_name().map(str::to_string),
            matched_name: None,
            matched_address: None,
            status,
            raw_response,
        }
    }

    /// `MALFORMED` for a record whose number failed validation.
    pub fn malformed(record: &NormalizedRecord, reason: &MalformedReason) -> Self {
        Self::base(
            record,
            MatchStatus::Malformed,
            json!({ "reason": reason.code(), "detail": reason.to_string() }),
        )
    }

    /// `MALFORMED` derived from the record itself. Returns `None` when the
    /// record's number is valid.
    pub fn malformed_from(record: &NormalizedRecord) -> Option<Self> {
        match &record.number {
            NumberCheck::Valid(_) => None,
            NumberCheck::Malformed { reason, .. } => Some(Self::malformed(record, reason)),
        }
    }

    /// `NOT_FOUND`: the registry answered and has no entry.
    pub fn not_found(record: &NormalizedRecord, raw_response: Value) -> Self {
        Self::base(record, MatchStatus::NotFound, raw_response)
    }

    /// `OK` or `NEED_CHECK`: the registry has an entry.
    pub fn matched(
        record: &NormalizedRecord,
        status: MatchStatus,
        matched_name: String,
        matched_address: Option<String>,
        raw_response: Value,
    ) -> Self {
        debug_assert!(matches!(status, MatchStatus::Ok | MatchStatus::NeedCheck));
        Self {
            matched_name: Some(matched_name),
            matched_address,
            ..Self::base(record, status, raw_response)
        }
    }

    /// `ERROR`: the lookup could not complete. `detail` carries diagnostics.
    pub fn error(record: &NormalizedRecord, detail: Value) -> Self {
        Self::base(record, MatchStatus::Error, detail)
    }

    /// `CANCELLED`: the batch stopped before this record started.
    pub fn cancelled(record: &NormalizedRecord) -> Self {
        Self::base(
            record,
            MatchStatus::Cancelled,
            json!({ "reason": "CANCELLED" }),
        )
    }

    pub fn corporate_number(&self) -> &str {
        &self.corporate_number
    }

    pub fn input_name(&self) -> Option<&str> {
        self.input_name.as_deref()
    }

    pub fn matched_name(&self) -> Option<&str> {
        self.matched_name.as_deref()
    }

    pub fn matched_address(&self) -> Option<&str> {
        self.matched_address.as_deref()
    }

    pub fn status(&self) -> MatchStatus {
        self.status
    }

    pub fn raw_response(&self) -> &Value {
        &self.raw_response
    }
}

// ---------------------------------------------------------------------------
// BatchResult
// ---------------------------------------------------------------------------

/// Ordered results for a batch, index-aligned 1:1 with the input.
///
/// `success_count` covers statuses where a lookup was answered;
/// `error_count` covers everything else (`ERROR`, `MALFORMED`, `CANCELLED`),
/// so `success_count + error_count == total_count` always holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    results: Vec<LookupResult>,
    total_count: usize,
    success_count: usize,
    error_count: usize,
}

impl BatchResult {
    /// Build from results already placed in input order.
    pub fn from_results(results: Vec<LookupResult>) -> Self {
        let total_count = results.len();
        let success_count = results.iter().filter(|r| r.status.is_success()).count();
        Self {
            results,
            total_count,
            success_count,
            error_count: total_count - success_count,
        }
    }

    pub fn results(&self) -> &[LookupResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<LookupResult> {
        self.results
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }

    pub fn success_count(&self) -> usize {
        self.success_count
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Number of results with the given status.
    pub fn count_of(&self, status: MatchStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    /// Statuses in input order.
    pub fn statuses(&self) -> Vec<MatchStatus> {
        self.results.iter().map(|r| r.status).collect()
    }
}
