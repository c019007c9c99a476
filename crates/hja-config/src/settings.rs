//! Typed settings over the merged config tree.
//!
//! Every field has a default, so an empty config is a working local setup
//! (minus the registry application id, which comes from the environment).

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::secrets::DEFAULT_APP_ID_ENV;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub registry: RegistrySettings,
    pub reconcile: ReconcileSettings,
    pub daemon: DaemonSettings,
}

impl Settings {
    pub fn from_config_json(config_json: &Value) -> Result<Self> {
        serde_json::from_value(config_json.clone()).context("CONFIG_INVALID: settings do not match schema")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    pub base_url: String,
    pub api_version: String,
    /// NAME of the env var holding the application id.
    pub app_id_env: String,
    /// Minimum spacing between registry requests.
    pub request_interval_ms: u64,
    /// Per-lookup deadline.
    pub timeout_ms: u64,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.houjin-bangou.nta.go.jp".to_string(),
            api_version: "4".to_string(),
            app_id_env: DEFAULT_APP_ID_ENV.to_string(),
            request_interval_ms: 1_000,
            timeout_ms: 10_000,
        }
    }
}

impl RegistrySettings {
    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileSettings {
    /// Concurrent lookups per batch; `1` is sequential.
    pub concurrency: usize,
    /// Retries per record on `ERROR`. Values above 2 are clamped by the
    /// orchestrator.
    pub max_retries: u32,
    /// First backoff; doubles per retry.
    pub retry_delay_ms: u64,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            concurrency: 4,
            max_retries: 2,
            retry_delay_ms: 200,
        }
    }
}

impl ReconcileSettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSettings {
    /// CORS allow-list. Exact origins, no wildcards.
    pub allowed_origins: Vec<String>,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}
