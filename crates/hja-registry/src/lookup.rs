//! Single-record lookup: one registry call, classified into a
//! [`LookupResult`].
//!
//! Classification, in priority order:
//! 1. malformed number          -> `MALFORMED` (no remote call)
//! 2. call failed or timed out  -> `ERROR`
//! 3. registry has no entry     -> `NOT_FOUND`
//! 4. names agree / input empty -> `OK`
//! 5. names differ              -> `NEED_CHECK`
//!
//! No retries here.

use std::sync::Arc;
use std::time::{Duration, Instant};

use hja_core::{
    names_match, normalize, LookupResult, MatchStatus, NormalizedRecord, NumberCheck, RawRecord,
};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::client::{RegistryClient, RegistryResponse};

/// Per-lookup deadline when none is configured.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Wraps a shared registry client with a per-lookup deadline.
#[derive(Clone)]
pub struct LookupClient {
    registry: Arc<dyn RegistryClient>,
    timeout: Duration,
}

impl LookupClient {
    pub fn new(registry: Arc<dyn RegistryClient>) -> Self {
        Self {
            registry,
            timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn registry(&self) -> &Arc<dyn RegistryClient> {
        &self.registry
    }

    /// Normalize then look up. Convenience for on-demand single checks.
    pub async fn lookup_raw(&self, record: &RawRecord) -> LookupResult {
        self.lookup(&normalize(record)).await
    }

    /// Look up one normalized record. Total: always returns a result.
    pub async fn lookup(&self, record: &NormalizedRecord) -> LookupResult {
        let number = match &record.number {
            NumberCheck::Valid(n) => n,
            NumberCheck::Malformed { reason, .. } => {
                debug!(candidate = record.number.display_str(), %reason, "skipping malformed number");
                return LookupResult::malformed(record, reason);
            }
        };

        let source = self.registry.name();
        // Rate-limit queueing happens before the deadline starts.
        self.registry.acquire_slot().await;
        let started = Instant::now();
        let outcome =
            tokio::time::timeout(self.timeout, self.registry.fetch_by_number(number)).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Err(_) => {
                warn!(%number, source, timeout_ms = self.timeout.as_millis() as u64, "registry lookup timed out");
                LookupResult::error(
                    record,
                    json!({
                        "source": source,
                        "kind": "timeout",
                        "detail": format!("no response within {} ms", self.timeout.as_millis()),
                        "elapsed_ms": elapsed_ms,
                    }),
                )
            }
            Ok(Err(e)) => {
                warn!(%number, source, kind = e.kind(), error = %e, "registry lookup failed");
                LookupResult::error(
                    record,
                    json!({
                        "source": source,
                        "kind": e.kind(),
                        "detail": e.to_string(),
                        "elapsed_ms": elapsed_ms,
                    }),
                )
            }
            Ok(Ok(resp)) => {
                let result = classify(record, resp, source);
                debug!(%number, status = result.status().as_str(), elapsed_ms, "registry lookup classified");
                result
            }
        }
    }
}

/// Classify a successful registry answer against the record.
///
/// Both names go through [`hja_core::normalize_name`] before comparison. An empty
/// input name counts as agreement.
pub fn classify(
    record: &NormalizedRecord,
    response: RegistryResponse,
    source: &str,
) -> LookupResult {
    let raw = audit_payload(source, &response);

    let Some(entry) = response.entry else {
        return LookupResult::not_found(record, raw);
    };

    let status = if record.name.is_empty() || names_match(&entry.name, &record.name) {
        MatchStatus::Ok
    } else {
        MatchStatus::NeedCheck
    };

    let address = Some(entry.address).filter(|a| !a.is_empty());
    LookupResult::matched(record, status, entry.name, address, raw)
}

fn audit_payload(source: &str, response: &RegistryResponse) -> Value {
    let mut payload = json!({
        "source": source,
        "body": response.raw,
    });
    if let Some(entry) = &response.entry {
        payload["post_code"] = json!(entry.post_code);
        payload["update_date"] = json!(entry.update_date);
        payload["close_date"] = json!(entry.close_date);
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{RegistryEntry, RegistryError};
    use hja_core::CorporateNumber;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-process registry: one optional entry, optional failure, optional delay.
    struct MockRegistry {
        entry: Option<RegistryEntry>,
        fail: Option<RegistryError>,
        delay: Duration,
        slot_wait: Duration,
        calls: AtomicUsize,
    }

    impl MockRegistry {
        fn with_name(name: &str) -> Self {
            Self {
                entry: Some(RegistryEntry {
                    corporate_number: "9234567890123".into(),
                    name: name.into(),
                    address: "東京都千代田区丸の内１丁目".into(),
                    post_code: Some("1000005".into()),
                    update_date: None,
                    close_date: None,
                }),
                fail: None,
                delay: Duration::ZERO,
                slot_wait: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        fn empty() -> Self {
            Self {
                entry: None,
                ..Self::with_name("")
            }
        }
    }

    #[async_trait::async_trait]
    impl RegistryClient for MockRegistry {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn acquire_slot(&self) {
            tokio::time::sleep(self.slot_wait).await;
        }

        async fn fetch_by_number(
            &self,
            _number: &CorporateNumber,
        ) -> Result<RegistryResponse, RegistryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if let Some(e) = &self.fail {
                return Err(e.clone());
            }
            Ok(RegistryResponse {
                entry: self.entry.clone(),
                raw: "raw".into(),
            })
        }
    }

    fn client(reg: MockRegistry) -> (LookupClient, Arc<MockRegistry>) {
        let reg = Arc::new(reg);
        (LookupClient::new(reg.clone()), reg)
    }

    #[tokio::test]
    async fn matching_name_is_ok() {
        let (c, _) = client(MockRegistry::with_name("ABC商事"));
        let r = c.lookup_raw(&RawRecord::new("9234567890123", Some("ABC商事"))).await;
        assert_eq!(r.status(), MatchStatus::Ok);
        assert_eq!(r.matched_name(), Some("ABC商事"));
        assert_eq!(r.matched_address(), Some("東京都千代田区丸の内１丁目"));
        assert_eq!(r.raw_response()["source"], "mock");
    }

    #[tokio::test]
    async fn different_name_needs_check() {
        let (c, _) = client(MockRegistry::with_name("ABC商事"));
        let r = c.lookup_raw(&RawRecord::new("9234567890123", Some("XYZ商事"))).await;
        assert_eq!(r.status(), MatchStatus::NeedCheck);
        assert_eq!(r.input_name(), Some("XYZ商事"));
        assert_eq!(r.matched_name(), Some("ABC商事"));
    }

    #[tokio::test]
    async fn width_difference_is_still_ok() {
        let (c, _) = client(MockRegistry::with_name("ＡＢＣ商事"));
        let r = c.lookup_raw(&RawRecord::new("9234567890123", Some(" ABC商事 "))).await;
        assert_eq!(r.status(), MatchStatus::Ok);
    }

    #[tokio::test]
    async fn empty_input_name_is_ok() {
        let (c, _) = client(MockRegistry::with_name("ABC商事"));
        let r = c.lookup_raw(&RawRecord::new("9234567890123", None)).await;
        assert_eq!(r.status(), MatchStatus::Ok);
        assert_eq!(r.input_name(), None);
    }

    #[tokio::test]
    async fn no_entry_is_not_found() {
        let (c, _) = client(MockRegistry::empty());
        let r = c.lookup_raw(&RawRecord::new("9999999999999", Some("X"))).await;
        assert_eq!(r.status(), MatchStatus::NotFound);
        assert!(r.matched_name().is_none());
    }

    #[tokio::test]
    async fn malformed_makes_no_call() {
        let (c, reg) = client(MockRegistry::with_name("ABC商事"));
        let short = c.lookup_raw(&RawRecord::new("123", Some("ABC商事"))).await;
        let bad_check = c.lookup_raw(&RawRecord::new("1234567890123", Some("ABC商事"))).await;
        assert_eq!(short.status(), MatchStatus::Malformed);
        assert_eq!(bad_check.status(), MatchStatus::Malformed);
        assert_eq!(bad_check.raw_response()["reason"], "CHECK_DIGIT_MISMATCH");
        assert_eq!(reg.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn registry_error_is_error() {
        let (c, _) = client(MockRegistry {
            fail: Some(RegistryError::Api {
                status: 503,
                message: "maintenance".into(),
            }),
            ..MockRegistry::with_name("ABC商事")
        });
        let r = c.lookup_raw(&RawRecord::new("9234567890123", Some("ABC商事"))).await;
        assert_eq!(r.status(), MatchStatus::Error);
        assert_eq!(r.raw_response()["kind"], "api");
        assert!(r.matched_name().is_none());
        assert!(r.matched_address().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_error() {
        let reg = MockRegistry {
            delay: Duration::from_secs(30),
            ..MockRegistry::with_name("ABC商事")
        };
        let (c, _) = client(reg);
        let c = c.with_timeout(Duration::from_secs(1));
        let r = c.lookup_raw(&RawRecord::new("9234567890123", Some("ABC商事"))).await;
        assert_eq!(r.status(), MatchStatus::Error);
        assert_eq!(r.raw_response()["kind"], "timeout");
    }

    #[tokio::test(start_paused = true)]
    async fn slot_wait_does_not_count_against_timeout() {
        let reg = MockRegistry {
            slot_wait: Duration::from_secs(5),
            delay: Duration::from_millis(500),
            ..MockRegistry::with_name("ABC商事")
        };
        let (c, reg) = client(reg);
        let c = c.with_timeout(Duration::from_secs(1));
        let r = c.lookup_raw(&RawRecord::new("9234567890123", Some("ABC商事"))).await;
        assert_eq!(r.status(), MatchStatus::Ok);
        assert_eq!(reg.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn classify_is_pure() {
        let rec = normalize(&RawRecord::new("9234567890123", Some("ABC商事")));
        let resp = RegistryResponse::not_found("2024-01-05,0,1,1");
        let a = classify(&rec, resp.clone(), "nta");
        let b = classify(&rec, resp, "nta");
        assert_eq!(a, b);
        assert_eq!(a.raw_response()["body"], "2024-01-05,0,1,1");
    }
}
