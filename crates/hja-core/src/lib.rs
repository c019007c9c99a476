//! hja-core
//!
//! Record model and the pure half of reconciliation: normalization of
//! uploaded business-partner records and structural validation of
//! corporate numbers.
//!
//! Deterministic, pure logic. No IO. No registry calls.

pub mod name;
pub mod number;
pub mod record;
pub mod result;

pub use name::{names_match, normalize_name};
pub use number::{
    compute_check_digit, is_valid_check_digit, normalize_corporate_number, CorporateNumber,
    MalformedReason, NumberCheck, CORPORATE_NUMBER_LEN,
};
pub use record::{normalize, FileMetadata, NormalizedRecord, RawRecord, RecordBatch};
pub use result::{BatchResult, LookupResult, MatchStatus};
