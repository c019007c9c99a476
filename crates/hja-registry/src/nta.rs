//! NTA corporate-number Web-API client.
//!
//! Queries `GET {base}/{version}/num` with `type=02` (CSV, Unicode). The
//! body is a header line `lastUpdateDate,count,divideNumber,divideSize`
//! followed by one row per entry.
//!
//! The application ID is passed in by the caller (resolved once from the
//! environment at startup) and never logged.

use std::time::Duration;

use chrono::NaiveDate;
use hja_core::CorporateNumber;
use tracing::debug;

use crate::client::{RegistryClient, RegistryEntry, RegistryError, RegistryResponse};
use crate::pacer::RequestPacer;

pub const NTA_DEFAULT_BASE_URL: &str = "https://api.houjin-bangou.nta.go.jp";
pub const NTA_DEFAULT_API_VERSION: &str = "4";

/// CSV, Unicode (UTF-8).
const RESPONSE_TYPE_CSV_UNICODE: &str = "02";

// Column positions in a `type=02` entry row.
const COL_CORPORATE_NUMBER: usize = 1;
const COL_UPDATE_DATE: usize = 4;
const COL_NAME: usize = 6;
const COL_PREFECTURE: usize = 9;
const COL_CITY: usize = 10;
const COL_STREET: usize = 11;
const COL_POST_CODE: usize = 15;
const COL_ADDRESS_OUTSIDE: usize = 16;
const COL_CLOSE_DATE: usize = 18;
const COL_LATEST: usize = 23;

/// Shortest row that still carries the post code.
const MIN_ROW_LEN: usize = COL_POST_CODE + 1;

/// Cap on how much of an error body ends up in diagnostics.
const ERROR_BODY_PREVIEW: usize = 200;

pub struct NtaRegistryClient {
    app_id: Option<String>,
    http: reqwest::Client,
    base_url: String,
    api_version: String,
    pacer: RequestPacer,
}

impl std::fmt::Debug for NtaRegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NtaRegistryClient")
            .field("app_id", &self.app_id.as_ref().map(|_| "<REDACTED>"))
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("pacer", &self.pacer)
            .finish()
    }
}

impl NtaRegistryClient {
    pub fn new(app_id: Option<String>) -> Self {
        Self::new_with_base_url(app_id, NTA_DEFAULT_BASE_URL.to_string())
    }

    pub fn new_with_base_url(app_id: Option<String>, base_url: String) -> Self {
        Self {
            app_id: app_id.filter(|s| !s.trim().is_empty()),
            http: reqwest::Client::new(),
            base_url,
            api_version: NTA_DEFAULT_API_VERSION.to_string(),
            pacer: RequestPacer::unpaced(),
        }
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Enforce a minimum spacing between requests (registry rate limit).
    pub fn with_request_interval(mut self, interval: Duration) -> Self {
        self.pacer = RequestPacer::new(interval);
        self
    }

    fn build_num_url(&self) -> String {
        format!(
            "{}/{}/num",
            self.base_url.trim_end_matches('/'),
            self.api_version.trim_matches('/')
        )
    }

    fn app_id(&self) -> Result<&str, RegistryError> {
        self.app_id
            .as_deref()
            .ok_or_else(|| RegistryError::Config("NTA application id is not configured".into()))
    }
}

#[async_trait::async_trait]
impl RegistryClient for NtaRegistryClient {
    fn name(&self) -> &'static str {
        "nta"
    }

    async fn ready(&self) -> Result<(), RegistryError> {
        self.app_id().map(|_| ())
    }

    async fn acquire_slot(&self) {
        self.pacer.wait().await;
    }

    async fn fetch_by_number(
        &self,
        number: &CorporateNumber,
    ) -> Result<RegistryResponse, RegistryError> {
        let app_id = self.app_id()?;

        debug!(number = %number, "nta num request");
        let resp = self
            .http
            .get(self.build_num_url())
            .query(&[
                ("id", app_id),
                ("number", number.as_str()),
                ("type", RESPONSE_TYPE_CSV_UNICODE),
                ("history", "0"),
            ])
            .send()
            .await
            .map_err(|e| RegistryError::Transport(e.without_url().to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| RegistryError::Transport(e.without_url().to_string()))?;

        if !status.is_success() {
            return Err(RegistryError::Api {
                status: status.as_u16(),
                message: body.chars().take(ERROR_BODY_PREVIEW).collect(),
            });
        }

        let entry = parse_num_csv(&body)?;
        Ok(RegistryResponse { entry, raw: body })
    }
}

// ---------------------------------------------------------------------------
// CSV decoding
// ---------------------------------------------------------------------------

/// Decode a `type=02` response body.
///
/// Returns `Ok(None)` when the header reports `count == 0`. When several
/// rows are present the one flagged `latest == 1` wins, otherwise the first.
pub fn parse_num_csv(body: &str) -> Result<Option<RegistryEntry>, RegistryError> {
    let body = body.trim_start_matches('\u{feff}');
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut records = rdr.records();

    let header = records
        .next()
        .ok_or_else(|| RegistryError::Decode("empty response body".into()))?
        .map_err(|e| RegistryError::Decode(format!("header row: {e}")))?;

    let count: usize = header
        .get(1)
        .map(str::trim)
        .ok_or_else(|| RegistryError::Decode("header row has no count column".into()))?
        .parse()
        .map_err(|_| RegistryError::Decode(format!("header count not numeric: {header:?}")))?;

    if count == 0 {
        return Ok(None);
    }

    let mut rows = Vec::new();
    for rec in records {
        let rec = rec.map_err(|e| RegistryError::Decode(format!("entry row: {e}")))?;
        if rec.len() < MIN_ROW_LEN {
            return Err(RegistryError::Decode(format!(
                "entry row has {} columns, expected at least {MIN_ROW_LEN}",
                rec.len()
            )));
        }
        rows.push(rec);
    }

    let row = rows
        .iter()
        .find(|r| r.get(COL_LATEST).map(str::trim) == Some("1"))
        .or_else(|| rows.first())
        .ok_or_else(|| {
            RegistryError::Decode(format!("header count={count} but no entry rows"))
        })?;

    let field = |i: usize| row.get(i).map(str::trim).unwrap_or("");

    let domestic = format!(
        "{}{}{}",
        field(COL_PREFECTURE),
        field(COL_CITY),
        field(COL_STREET)
    );
    let address = if domestic.is_empty() {
        field(COL_ADDRESS_OUTSIDE).to_string()
    } else {
        domestic
    };

    Ok(Some(RegistryEntry {
        corporate_number: field(COL_CORPORATE_NUMBER).to_string(),
        name: field(COL_NAME).to_string(),
        address,
        post_code: Some(field(COL_POST_CODE))
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        update_date: parse_date(field(COL_UPDATE_DATE)),
        close_date: parse_date(field(COL_CLOSE_DATE)),
    }))
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

// -----------------
// Tests (httpmock)
// -----------------
