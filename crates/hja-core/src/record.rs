//! Uploaded records and their normalized form.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::name::normalize_name;
use crate::number::{normalize_corporate_number, NumberCheck};

// ---------------------------------------------------------------------------
// Upload boundary
// ---------------------------------------------------------------------------

/// Metadata about the decoded upload. Produced by the upload collaborator;
/// the core never reads file bytes itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub filename: String,
    /// Detected text encoding (e.g. `"utf-8-sig"`, `"cp932"`).
    pub encoding: String,
    pub row_count: usize,
}

/// A decoded upload: metadata plus rows in file order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordBatch {
    pub metadata: FileMetadata,
    pub records: Vec<RawRecord>,
}

/// One row of the uploaded file.
///
/// Accepts both the upload row shape (`company_name`, `corp_number`, `raw`)
/// and the batch wire shape (`corporate_number`, `name`). Columns the core
/// does not recognize are carried in `extra` for display only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Opaque source-row identifier.
    #[serde(default)]
    pub client_id: String,
    /// Free text; `None` when the column was absent or null.
    #[serde(default, alias = "name")]
    pub company_name: Option<String>,
    /// Free text; may contain separators or full-width digits.
    #[serde(default, alias = "corp_number")]
    pub corporate_number: String,
    #[serde(default)]
    pub zip_code: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, alias = "raw", skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl RawRecord {
    /// Minimal record with just a number and an optional name.
    pub fn new(corporate_number: impl Into<String>, company_name: Option<&str>) -> Self {
        Self {
            corporate_number: corporate_number.into(),
            company_name: company_name.map(str::to_string),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Normalized record
// ---------------------------------------------------------------------------

/// A [`RawRecord`] after canonicalization.
///
/// `number` is either a valid [`crate::CorporateNumber`] or explicitly
/// malformed. `name` is the normalized company name; an absent name becomes
/// the empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub source: RawRecord,
    pub number: NumberCheck,
    pub name: String,
}

impl NormalizedRecord {
    /// The name exactly as uploaded, before normalization.
    pub fn input_name(&self) -> Option<&str> {
        self.source.company_name.as_deref()
    }
}

/// Normalize one record. Pure and total: every input yields an output,
/// malformed numbers are tagged rather than rejected.
pub fn normalize(record: &RawRecord) -> NormalizedRecord {
    NormalizedRecord {
        source: record.clone(),
        number: normalize_corporate_number(&record.corporate_number),
        name: normalize_name(record.company_name.as_deref().unwrap_or("")),
    }
}
