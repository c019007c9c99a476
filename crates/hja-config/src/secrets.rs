//! Runtime secret resolution.
//!
//! Config stores the env var NAME (`registry.app_id_env`); the value is read
//! here, once, at startup. Errors name the variable, never its value, and
//! `Debug` redacts resolved values.

use anyhow::{bail, Result};
use serde_json::Value;

/// Env var read for the registry application id when config names none.
pub const DEFAULT_APP_ID_ENV: &str = "HOUJIN_APP_ID";

#[derive(Clone)]
pub struct ResolvedSecrets {
    /// Name of the env var the app id was read from.
    pub app_id_env: String,
    /// `None` if the named env var was unset or blank.
    pub app_id: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("app_id_env", &self.app_id_env)
            .field("app_id", &self.app_id.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

impl ResolvedSecrets {
    /// The app id, or SECRETS_MISSING naming the env var.
    pub fn require_app_id(&self) -> Result<&str> {
        match self.app_id.as_deref() {
            Some(v) => Ok(v),
            None => bail!(
                "SECRETS_MISSING: required env var '{}' (registry application id) is not set or empty",
                self.app_id_env
            ),
        }
    }
}

fn read_str_at(config: &Value, pointer: &str) -> Option<String> {
    let s = config.pointer(pointer)?.as_str()?.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

/// Resolve secrets named by the config. Missing values are not an error
/// here; callers that need one use [`ResolvedSecrets::require_app_id`].
pub fn resolve_secrets(config_json: &Value) -> ResolvedSecrets {
    let app_id_env = read_str_at(config_json, "/registry/app_id_env")
        .unwrap_or_else(|| DEFAULT_APP_ID_ENV.to_string());
    let app_id = resolve_env(&app_id_env);
    ResolvedSecrets { app_id_env, app_id }
}
