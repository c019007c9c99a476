//! Registry boundary: the client trait plus raw response and error types.
//!
//! No classification happens here (that is `lookup.rs`) and no concrete HTTP
//! code lives here (that is `nta.rs`).

use std::fmt;

use chrono::NaiveDate;
use hja_core::CorporateNumber;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// One registry entry, as reported by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub corporate_number: String,
    /// Registered trade name, exactly as the registry returns it.
    pub name: String,
    /// Prefecture + city + street, concatenated.
    pub address: String,
    pub post_code: Option<String>,
    pub update_date: Option<NaiveDate>,
    /// Set when the corporation has been closed (merger, liquidation, ...).
    pub close_date: Option<NaiveDate>,
}

/// What a registry returned for one number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryResponse {
    /// `None` when the registry answered but has no entry for the number.
    pub entry: Option<RegistryEntry>,
    /// Undecoded response body, kept for audit.
    pub raw: String,
}

impl RegistryResponse {
    pub fn found(entry: RegistryEntry, raw: impl Into<String>) -> Self {
        Self {
            entry: Some(entry),
            raw: raw.into(),
        }
    }

    pub fn not_found(raw: impl Into<String>) -> Self {
        Self {
            entry: None,
            raw: raw.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors a [`RegistryClient`] may return. All of them classify as `ERROR`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Network or transport failure.
    Transport(String),
    /// The registry answered with a non-success HTTP status.
    Api { status: u16, message: String },
    /// The response body could not be decoded.
    Decode(String),
    /// A required setting (e.g. the application ID) is missing.
    Config(String),
}

impl RegistryError {
    /// Stable machine-readable kind, used in audit payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            RegistryError::Transport(_) => "transport",
            RegistryError::Api { .. } => "api",
            RegistryError::Decode(_) => "decode",
            RegistryError::Config(_) => "config",
        }
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Transport(msg) => write!(f, "transport error: {msg}"),
            RegistryError::Api { status, message } => {
                write!(f, "registry api error status={status}: {message}")
            }
            RegistryError::Decode(msg) => write!(f, "decode error: {msg}"),
            RegistryError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for RegistryError {}

// ---------------------------------------------------------------------------
// Client trait
// ---------------------------------------------------------------------------

/// Corporate registry contract.
///
/// Implementations are stateless from the caller's point of view and are
/// shared across concurrent lookups behind an `Arc<dyn RegistryClient>`.
#[async_trait::async_trait]
pub trait RegistryClient: Send + Sync {
    /// Short name identifying the registry (e.g. `"nta"`).
    fn name(&self) -> &'static str;

    /// Cheap preflight run once per batch before any record starts.
    ///
    /// Returning `Err` means no lookup can possibly succeed. The default
    /// assumes the registry is usable.
    async fn ready(&self) -> Result<(), RegistryError> {
        Ok(())
    }

    /// Wait for permission to send one request (rate limiting).
    ///
    /// Callers await this before starting the per-lookup deadline, so time
    /// queued here never counts as a timeout. The default never waits.
    async fn acquire_slot(&self) {}

    /// Query the registry for exactly one number. Does not pace itself; see
    /// [`RegistryClient::acquire_slot`].
    async fn fetch_by_number(
        &self,
        number: &CorporateNumber,
    ) -> Result<RegistryResponse, RegistryError>;
}
