use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use hja_config::{load_defaults, load_layered_yaml, report_unused_keys, resolve_secrets, Settings, UnusedKeyPolicy};
use hja_core::RawRecord;
use hja_reconcile::{build_orchestrator, nta_registry};
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct RequestFile {
    records: Vec<RawRecord>,
}

/// Run one batch against the NTA registry and print the `BatchResult` JSON.
pub async fn run(input: &str, config_paths: &[String], concurrency: Option<usize>) -> Result<()> {
    let loaded = if config_paths.is_empty() {
        load_defaults()?
    } else {
        load_layered_yaml(config_paths)?
    };
    let unused = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    for ptr in &unused.unused_leaf_pointers {
        warn!(key = %ptr, "unused config key");
    }
    let mut settings: Settings = loaded.settings()?;
    if let Some(c) = concurrency {
        settings.reconcile.concurrency = c;
    }

    let secrets = resolve_secrets(&loaded.config_json);
    let app_id = secrets.require_app_id()?.to_string();

    let raw = fs::read_to_string(input).with_context(|| format!("failed to read input: {input}"))?;
    let request: RequestFile =
        serde_json::from_str(&raw).with_context(|| format!("input is not a batch request: {input}"))?;

    let registry = nta_registry(&settings.registry, Some(app_id));
    let orchestrator = build_orchestrator(Arc::new(registry), &settings);

    info!(config_hash = %loaded.config_hash, records = request.records.len(), "reconcile start");
    let batch = orchestrator
        .reconcile(&request.records)
        .await
        .context("batch refused")?;

    println!("{}", serde_json::to_string_pretty(&batch)?);
    Ok(())
}
