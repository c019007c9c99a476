//! Config files carry env var names only. Literal credentials are rejected at
//! load time, and resolved values never show up in `Debug` or error text.
//!
//! Missing-variable cases use sentinel names that are never set anywhere, so
//! no test mutates the process environment except the one that sets its own
//! uniquely-named variable.

use hja_config::{load_layered_yaml_from_strings, resolve_secrets};

fn load(yaml: &str) -> serde_json::Value {
    load_layered_yaml_from_strings(&[yaml])
        .expect("test yaml must parse cleanly")
        .config_json
}

#[test]
fn token_shaped_literal_is_rejected() {
    let yaml = r#"
registry:
  base_url: "sk-live-abcdefghijklmnop"
"#;
    let err = load_layered_yaml_from_strings(&[yaml]).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("CONFIG_SECRET_DETECTED"), "got: {msg}");
    assert!(msg.contains("/registry/base_url"), "got: {msg}");
    assert!(!msg.contains("abcdefghijklmnop"), "value leaked: {msg}");
}

#[test]
fn pasted_app_id_is_rejected() {
    let yaml = r#"
registry:
  app_id_env: "Kx7pQ2mN9rT4w"
"#;
    let err = load_layered_yaml_from_strings(&[yaml]).unwrap_err();
    assert!(err.to_string().contains("CONFIG_SECRET_DETECTED"));
}

#[test]
fn env_var_name_is_accepted() {
    let cfg = load("registry:\n  app_id_env: \"HJA_SENTINEL_APP_ID_NEVER_SET_A1\"\n");
    let secrets = resolve_secrets(&cfg);
    assert_eq!(secrets.app_id_env, "HJA_SENTINEL_APP_ID_NEVER_SET_A1");
    assert!(secrets.app_id.is_none());
}

#[test]
fn missing_app_id_error_names_the_variable() {
    let cfg = load("registry:\n  app_id_env: \"HJA_SENTINEL_APP_ID_NEVER_SET_B2\"\n");
    let err = resolve_secrets(&cfg).require_app_id().unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("SECRETS_MISSING"), "got: {msg}");
    assert!(msg.contains("HJA_SENTINEL_APP_ID_NEVER_SET_B2"), "got: {msg}");
}

#[test]
fn default_env_name_when_config_is_silent() {
    let secrets = resolve_secrets(&load("reconcile:\n  concurrency: 2\n"));
    assert_eq!(secrets.app_id_env, "HOUJIN_APP_ID");
}

#[test]
fn resolved_value_is_redacted_in_debug() {
    let var = "HJA_SECRETS_TEST_APP_ID_C3";
    std::env::set_var(var, "secretvalue123");
    let cfg = load(&format!("registry:\n  app_id_env: \"{var}\"\n"));
    let secrets = resolve_secrets(&cfg);
    std::env::remove_var(var);

    assert_eq!(secrets.require_app_id().unwrap(), "secretvalue123");
    let dbg = format!("{secrets:?}");
    assert!(dbg.contains("<REDACTED>"), "got: {dbg}");
    assert!(!dbg.contains("secretvalue123"), "value leaked: {dbg}");
    assert!(dbg.contains(var));
}
