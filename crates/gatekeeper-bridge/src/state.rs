//! Shared state handed to every bridge handler through axum's `State`
//! extractor.

use gatekeeper_auth::{ApiKeyStore, AuditSink, TokenIssuer};
use gatekeeper_policy::RateLimiterRegistry;
use gatekeeper_session::SessionManager;
use gatekeeper_store::{ExternalizerConfig, FileStore};
use std::sync::Arc;

/// Everything the bridge's handlers need. Built once at startup and
/// shared behind an `Arc` - nothing here is mutated directly, the
/// interior types (`SessionManager`, `RateLimiterRegistry`, `FileStore`)
/// already manage their own synchronization.
pub struct BridgeState {
    pub sessions: Arc<SessionManager>,
    pub rate_limiter: RateLimiterRegistry,
    pub audit: Arc<dyn AuditSink>,
    pub store: FileStore,
    pub externalizer_config: ExternalizerConfig,
    pub api_keys: Option<Arc<dyn ApiKeyStore>>,
    pub oauth: Option<Arc<TokenIssuer>>,
    pub protocol_version: String,
    pub server_name: String,
    pub server_version: String,
    /// `true` runs the full Streamable-HTTP session lifecycle (spec
    /// §4.10); `false` runs the classic HTTP JSON-RPC fallback, which
    /// spins up and tears down an ephemeral session per request instead
    /// of requiring `Mcp-Session-Id` (spec §6).
    pub require_sessions: bool,
}
