//! Settings to orchestrator. Shared by the daemon and the CLI.

use std::sync::Arc;

use hja_config::{RegistrySettings, Settings};
use hja_registry::{LookupClient, NtaRegistryClient, RegistryClient};

use crate::orchestrator::{Orchestrator, ReconcileOptions};
use crate::retry::RetryPolicy;

/// NTA client for the configured endpoint and rate limit. `app_id` may be
/// `None`; the client then fails its preflight.
pub fn nta_registry(settings: &RegistrySettings, app_id: Option<String>) -> NtaRegistryClient {
    NtaRegistryClient::new_with_base_url(app_id, settings.base_url.clone())
        .with_api_version(settings.api_version.clone())
        .with_request_interval(settings.request_interval())
}

/// Orchestrator over any registry, tuned by `settings`.
pub fn build_orchestrator(registry: Arc<dyn RegistryClient>, settings: &Settings) -> Orchestrator {
    let lookup = LookupClient::new(registry).with_timeout(settings.registry.timeout());
    let options = ReconcileOptions {
        concurrency: settings.reconcile.concurrency,
        retry: RetryPolicy::new(
            settings.reconcile.max_retries,
            settings.reconcile.retry_delay(),
        ),
    };
    Orchestrator::new(lookup, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn build_orchestrator_applies_settings() {
        let mut settings = Settings::default();
        settings.reconcile.concurrency = 2;
        settings.reconcile.max_retries = 9;
        settings.reconcile.retry_delay_ms = 50;
        settings.registry.timeout_ms = 1_500;

        let o = build_orchestrator(Arc::new(hja_testkit::StubRegistry::new()), &settings);
        assert_eq!(o.options().concurrency, 2);
        assert_eq!(o.options().retry.max_retries(), 2);
        assert_eq!(o.options().retry.initial_backoff(), Duration::from_millis(50));
        assert_eq!(o.lookup_client().timeout(), Duration::from_millis(1_500));
    }

    #[test]
    fn nta_registry_follows_settings() {
        let settings = Settings::default();
        let o = build_orchestrator(Arc::new(nta_registry(&settings.registry, None)), &settings);
        assert_eq!(o.lookup_client().registry().name(), "nta");
    }

    #[tokio::test]
    async fn nta_registry_without_app_id_fails_preflight() {
        let registry = nta_registry(&Settings::default().registry, None);
        assert!(registry.ready().await.is_err());
    }
}
