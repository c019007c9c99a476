//! hja-testkit
//!
//! In-process registry stub for orchestrator and daemon tests: scripted
//! entries, injected failures and delays, and a record of every remote call
//! so tests can prove that malformed numbers never reach the registry.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use hja_core::{compute_check_digit, CorporateNumber};
use hja_registry::{RegistryClient, RegistryEntry, RegistryError, RegistryResponse};

/// Build a valid 13-digit corporate number from a 12-digit payload.
///
/// Panics if `payload` is not exactly 12 ASCII digits (test input only).
pub fn valid_number(payload: &str) -> String {
    assert!(
        payload.len() == 12 && payload.bytes().all(|b| b.is_ascii_digit()),
        "payload must be 12 digits: {payload}"
    );
    let mut digits = [0u8; 12];
    for (slot, b) in digits.iter_mut().zip(payload.bytes()) {
        *slot = b - b'0';
    }
    format!("{}{payload}", compute_check_digit(&digits))
}

/// Registry entry with just a number, name and address.
pub fn entry(number: &str, name: &str, address: &str) -> RegistryEntry {
    RegistryEntry {
        corporate_number: number.to_string(),
        name: name.to_string(),
        address: address.to_string(),
        post_code: None,
        update_date: None,
        close_date: None,
    }
}

/// Scripted [`RegistryClient`].
///
/// Unknown numbers answer "no entry". Failure scripts are consumed in order
/// per number; once exhausted, the number answers normally.
#[derive(Default)]
pub struct StubRegistry {
    entries: HashMap<String, RegistryEntry>,
    delays: HashMap<String, Duration>,
    always_fail: HashMap<String, RegistryError>,
    scripted_failures: Mutex<HashMap<String, VecDeque<RegistryError>>>,
    not_ready: Option<RegistryError>,
    calls: Mutex<Vec<String>>,
}

impl StubRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, number: &str, name: &str, address: &str) -> Self {
        self.entries
            .insert(number.to_string(), entry(number, name, address));
        self
    }

    /// Sleep before answering for `number` (drives timeouts and
    /// out-of-order completion).
    pub fn with_delay(mut self, number: &str, delay: Duration) -> Self {
        self.delays.insert(number.to_string(), delay);
        self
    }

    /// Fail the next `times` calls for `number` with `err`, then answer normally.
    pub fn failing_times(self, number: &str, times: usize, err: RegistryError) -> Self {
        if let Ok(mut scripts) = self.scripted_failures.lock() {
            scripts
                .entry(number.to_string())
                .or_default()
                .extend(std::iter::repeat(err).take(times));
        }
        self
    }

    /// Fail every call for `number`.
    pub fn always_failing(mut self, number: &str, err: RegistryError) -> Self {
        self.always_fail.insert(number.to_string(), err);
        self
    }

    /// Make the batch preflight fail.
    pub fn not_ready(mut self, err: RegistryError) -> Self {
        self.not_ready = Some(err);
        self
    }

    /// Every number passed to `fetch_by_number`, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn total_calls(&self) -> usize {
        self.calls().len()
    }

    pub fn calls_for(&self, number: &str) -> usize {
        self.calls().iter().filter(|n| *n == number).count()
    }

    fn next_scripted_failure(&self, number: &str) -> Option<RegistryError> {
        self.scripted_failures
            .lock()
            .ok()?
            .get_mut(number)
            .and_then(VecDeque::pop_front)
    }
}

#[async_trait::async_trait]
impl RegistryClient for StubRegistry {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn ready(&self) -> Result<(), RegistryError> {
        match &self.not_ready {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    async fn fetch_by_number(
        &self,
        number: &CorporateNumber,
    ) -> Result<RegistryResponse, RegistryError> {
        let key = number.as_str();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(key.to_string());
        }

        if let Some(delay) = self.delays.get(key) {
            tokio::time::sleep(*delay).await;
        }

        if let Some(e) = self.always_fail.get(key) {
            return Err(e.clone());
        }
        if let Some(e) = self.next_scripted_failure(key) {
            return Err(e);
        }

        Ok(match self.entries.get(key) {
            Some(e) => RegistryResponse::found(e.clone(), format!("stub:{key}:found")),
            None => RegistryResponse::not_found(format!("stub:{key}:none")),
        })
    }
}
