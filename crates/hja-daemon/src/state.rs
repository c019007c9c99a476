//! Shared runtime state for hja-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The orchestrator is
//! stateless between batches, so nothing here needs a lock.

use std::sync::Arc;

use hja_config::{ResolvedSecrets, Settings};
use hja_reconcile::{build_orchestrator, nta_registry, Orchestrator};
use serde::{Deserialize, Serialize};

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Clone)]
pub struct AppState {
    pub build: BuildInfo,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            build: BuildInfo {
                service: "hja-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// Wire the NTA registry client from settings and resolved secrets.
    ///
    /// A missing application id is not fatal here: batches then fail their
    /// preflight with 503 until the env var is set and the daemon restarted.
    pub fn from_config(settings: &Settings, secrets: &ResolvedSecrets) -> Self {
        let registry = nta_registry(&settings.registry, secrets.app_id.clone());
        Self::new(build_orchestrator(Arc::new(registry), settings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_uses_nta_registry() {
        let secrets = hja_config::resolve_secrets(&serde_json::json!({
            "registry": { "app_id_env": "HJA_SENTINEL_DAEMON_APP_ID_NEVER_SET" }
        }));
        let st = AppState::from_config(&Settings::default(), &secrets);
        assert_eq!(st.orchestrator.lookup_client().registry().name(), "nta");
        assert_eq!(st.build.service, "hja-daemon");
    }
}
