//! Request and response types for the hja-daemon HTTP endpoints.
//!
//! Batch and single-check responses serialize the domain types
//! ([`hja_core::LookupResult`], [`hja_core::BatchResult`]) directly.

use hja_core::{FileMetadata, RawRecord};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// /v1/checks/lookup
// ---------------------------------------------------------------------------

/// One check: a corporate number and an optional name to compare.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInput {
    pub corporate_number: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl CheckInput {
    pub fn into_record(self) -> RawRecord {
        RawRecord {
            corporate_number: self.corporate_number,
            company_name: self.name,
            ..RawRecord::default()
        }
    }
}

// ---------------------------------------------------------------------------
// /v1/checks/bulk, /v1/checks/bulk/stream
// ---------------------------------------------------------------------------

/// Batch request. `records` accepts either `{corporate_number, name}` items
/// or full upload rows; `metadata` is passed through when the batch came
/// from a decoded file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkLookupRequest {
    pub records: Vec<RawRecord>,
    #[serde(default)]
    pub metadata: Option<FileMetadata>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Body for 4xx/5xx responses. `error` is a stable code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub detail: String,
}
