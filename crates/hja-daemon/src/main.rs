//! hja-daemon entry point.
//!
//! Thin: loads config, sets up tracing, builds the shared state, wires
//! middleware and serves. Handlers live in `routes.rs`.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use hja_config::{load_defaults, load_layered_yaml, report_unused_keys, resolve_secrets, UnusedKeyPolicy};
use hja_daemon::{routes, state};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn, Level};

/// Comma-separated config paths, merged in order.
const CONFIG_ENV: &str = "HJA_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/base.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let loaded = load_config()?;
    let unused = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    for ptr in &unused.unused_leaf_pointers {
        warn!(key = %ptr, "unused config key");
    }
    let settings = loaded.settings()?;
    let secrets = resolve_secrets(&loaded.config_json);
    if secrets.app_id.is_none() {
        warn!(
            env = %secrets.app_id_env,
            "registry application id not set; batch requests will answer 503"
        );
    }
    info!(config_hash = %loaded.config_hash, "config loaded");

    let shared = Arc::new(state::AppState::from_config(&settings, &secrets));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(routes::cors_allow_list(&settings.daemon.allowed_origins));

    let addr = bind_addr_from_env().unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8000)));
    info!(origins = ?settings.daemon.allowed_origins, "hja-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn load_config() -> anyhow::Result<hja_config::LoadedConfig> {
    match std::env::var(CONFIG_ENV) {
        Ok(v) if !v.trim().is_empty() => {
            let paths: Vec<&str> = v.split(',').map(str::trim).filter(|p| !p.is_empty()).collect();
            load_layered_yaml(paths.as_slice())
        }
        _ if std::path::Path::new(DEFAULT_CONFIG_PATH).exists() => {
            load_layered_yaml(&[DEFAULT_CONFIG_PATH])
        }
        _ => load_defaults(),
    }
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("HJA_DAEMON_ADDR").ok()?.parse().ok()
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => {
            warn!(error = %e, "ctrl-c handler unavailable; running until killed");
            std::future::pending::<()>().await
        }
    }
}
