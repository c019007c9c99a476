//! hja-registry
//!
//! Registry boundary for corporate-number lookups.
//!
//! - [`client`] defines the pluggable [`RegistryClient`] trait and the raw
//!   response/error types.
//! - [`nta`] is the concrete client for the NTA corporate-number Web-API.
//! - [`lookup`] turns one registry answer (or failure) into a classified
//!   [`hja_core::LookupResult`]. It never retries; retry policy belongs to
//!   the orchestrator, which knows the batch-level budget.

pub mod client;
pub mod lookup;
pub mod nta;
pub mod pacer;

pub use client::{RegistryClient, RegistryEntry, RegistryError, RegistryResponse};
pub use lookup::{classify, LookupClient, DEFAULT_LOOKUP_TIMEOUT};
pub use nta::{parse_num_csv, NtaRegistryClient, NTA_DEFAULT_API_VERSION, NTA_DEFAULT_BASE_URL};
pub use pacer::RequestPacer;
