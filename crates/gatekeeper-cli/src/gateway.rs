//! Wiring for `mcp-gatekeeper gateway`: load the plugin catalog, build
//! `GatewayState`, and run either the stdio or the classic-HTTP transport
//! to completion.

use crate::cli::{GatewayArgs, GatewayTransport};
use crate::{plugins, signal};
use anyhow::{Context, Result};
use gatekeeper_auth::audit::TracingAuditSink;
use gatekeeper_auth::{ApiKeyRecord, ApiKeyStore, InMemoryApiKeyStore};
use gatekeeper_gateway::registry::ToolRegistry;
use gatekeeper_gateway::GatewayState;
use gatekeeper_policy::RateLimiterRegistry;
use gatekeeper_sandbox::SandboxConfig;
use gatekeeper_store::{ExternalizerConfig, FileStore};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub async fn run(args: GatewayArgs) -> Result<()> {
    let plugin_file = plugins::load(&args.plugins)?;
    let registry =
        ToolRegistry::load(plugin_file).context("tool catalog failed validation at load")?;

    let wasm_dir = args.wasm_dir.clone().unwrap_or_else(|| args.root_dir.join(".wasm"));
    let api_keys = build_api_key_store(&args.api_keys).await;

    let state = Arc::new(GatewayState {
        registry,
        sandbox_config: SandboxConfig {
            root_dir: args.root_dir.clone(),
            wasm_dir,
        },
        store: FileStore::new(args.root_dir.join(".gatekeeper-store")),
        externalizer_config: ExternalizerConfig::new(args.host.clone(), args.root_dir.clone()),
        rate_limiter: RateLimiterRegistry::new(args.rate_limit, Duration::from_secs(args.rate_window_secs)),
        audit: Arc::new(TracingAuditSink),
        server_name: "mcp-gatekeeper".to_string(),
        server_version: env!("CARGO_PKG_VERSION").to_string(),
        api_keys,
        metrics: gatekeeper_protocol::GatewayMetrics::default(),
    });

    match args.transport {
        GatewayTransport::Stdio => run_stdio(state).await,
        GatewayTransport::Http => run_http(state, &args.listen).await,
    }
}

async fn run_stdio(state: Arc<GatewayState>) -> Result<()> {
    let cancellation = CancellationToken::new();
    let cancel_on_signal = cancellation.clone();
    tokio::spawn(async move { signal::wait_for_shutdown(cancel_on_signal).await });

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    // stdio mode has no per-caller identity; the whole process runs as
    // whatever key (if any) was provisioned at startup, per spec §6.
    let api_key = state.api_keys.as_ref().map(|_| unscoped_stdio_key());
    gatekeeper_gateway::stdio::run(&state, api_key.as_ref(), stdin, stdout, &cancellation).await;
    Ok(())
}

fn unscoped_stdio_key() -> ApiKeyRecord {
    ApiKeyRecord {
        key_id: "stdio".to_string(),
        label: "stdio".to_string(),
        visible_tools: None,
    }
}

async fn run_http(state: Arc<GatewayState>, listen: &str) -> Result<()> {
    let app = gatekeeper_gateway::http::router(state);
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("binding gateway HTTP listener on {listen}"))?;
    tracing::info!(addr = %listen, "gateway listening");

    let cancellation = CancellationToken::new();
    let cancel_on_signal = cancellation.clone();
    tokio::spawn(async move { signal::wait_for_shutdown(cancel_on_signal).await });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancellation.cancelled().await })
        .await
        .context("gateway HTTP server failed")
}

async fn build_api_key_store(api_keys: &[(String, String)]) -> Option<Arc<dyn ApiKeyStore>> {
    if api_keys.is_empty() {
        return None;
    }
    let store = InMemoryApiKeyStore::new();
    for (key_id, secret) in api_keys {
        store
            .insert(
                secret.clone(),
                ApiKeyRecord {
                    key_id: key_id.clone(),
                    label: key_id.clone(),
                    visible_tools: None,
                },
            )
            .await;
    }
    Some(Arc::new(store))
}
