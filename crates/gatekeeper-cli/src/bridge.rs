//! Wiring for `mcp-gatekeeper bridge`: build `BridgeState` (session
//! manager, rate limiter, optional API-key/OAuth auth) and serve the
//! Streamable-HTTP router until shutdown.

use crate::cli::BridgeArgs;
use crate::signal;
use anyhow::Context;
use gatekeeper_auth::audit::TracingAuditSink;
use gatekeeper_auth::{ApiKeyRecord, ApiKeyStore, InMemoryApiKeyStore, InMemoryClientStore, OAuthClient, TokenIssuer};
use gatekeeper_bridge::BridgeState;
use gatekeeper_policy::RateLimiterRegistry;
use gatekeeper_rpc::{ClientConfig, ClientInfo};
use gatekeeper_session::{SessionManager, SessionManagerConfig};
use gatekeeper_store::{ExternalizerConfig, FileStore};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub async fn run(args: BridgeArgs) -> anyhow::Result<()> {
    let client_template = ClientConfig {
        command: args.upstream_command.clone(),
        args: args.upstream_args.clone(),
        cwd: args.upstream_cwd.clone(),
        client_info: ClientInfo {
            name: "mcp-gatekeeper-bridge".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        ..ClientConfig::default()
    };

    let sessions = SessionManager::new(SessionManagerConfig {
        client_template,
        ttl: Duration::from_secs(args.session_ttl_secs),
        protocol_version: gatekeeper_protocol::MCP_PROTOCOL_VERSION.to_string(),
    });

    let oauth = (!args.oauth_clients.is_empty()).then(|| {
        let clients = args
            .oauth_clients
            .iter()
            .map(|(client_id, client_secret)| OAuthClient {
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                scope: None,
            })
            .collect();
        Arc::new(TokenIssuer::new(
            Box::new(InMemoryClientStore::new(clients)),
            Duration::from_secs(args.oauth_access_ttl_secs),
        ))
    });

    let state = Arc::new(BridgeState {
        sessions: Arc::clone(&sessions),
        rate_limiter: RateLimiterRegistry::new(args.rate_limit, Duration::from_secs(args.rate_window_secs)),
        audit: Arc::new(TracingAuditSink),
        store: FileStore::new(args.files_dir.clone()),
        externalizer_config: ExternalizerConfig::new(args.host.clone(), args.files_dir.clone()),
        api_keys: build_api_key_store(&args.api_keys).await,
        oauth,
        protocol_version: gatekeeper_protocol::MCP_PROTOCOL_VERSION.to_string(),
        server_name: "mcp-gatekeeper-bridge".to_string(),
        server_version: env!("CARGO_PKG_VERSION").to_string(),
        require_sessions: args.require_sessions,
    });

    let reaper = tokio::spawn(Arc::clone(&sessions).run_reaper());
    let app = gatekeeper_bridge::router(state);
    let listener = tokio::net::TcpListener::bind(&args.listen)
        .await
        .with_context(|| format!("binding bridge HTTP listener on {}", args.listen))?;
    tracing::info!(addr = %args.listen, "bridge listening");

    let cancellation = CancellationToken::new();
    let cancel_on_signal = cancellation.clone();
    tokio::spawn(async move { signal::wait_for_shutdown(cancel_on_signal).await });

    // Spec §5 shutdown order: cancel -> stop reaper -> close all sessions
    // -> *then* stop accepting/drain. `close_all` must run concurrently
    // with (not after) the HTTP listener's graceful drain below, since
    // it's what kills each session's child and unblocks any handler
    // currently parked in `forward()` on a hung upstream - running it only
    // after `axum::serve` returns would mean it never returns at all.
    let sessions_for_shutdown = Arc::clone(&sessions);
    let cancel_for_sessions = cancellation.clone();
    let close_sessions = tokio::spawn(async move {
        cancel_for_sessions.cancelled().await;
        sessions_for_shutdown.stop_reaper();
        sessions_for_shutdown.close_all().await;
    });

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancellation.cancelled().await })
        .await
        .context("bridge HTTP server failed");

    let _ = close_sessions.await;
    let _ = reaper.await;
    result
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
