//! Streamable-HTTP bridge proxy fronting an upstream stdio MCP server
//! (spec §4.10, §6): session lifecycle over `/mcp`, SSE event stream,
//! OAuth token/discovery endpoints, file retrieval, and health.

pub mod auth;
pub mod error;
pub mod files;
pub mod headers;
pub mod health;
pub mod mcp;
pub mod oauth;
pub mod state;

pub use error::BridgeError;
pub use state::BridgeState;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

/// Builds the full bridge router. OAuth routes (`/oauth/token` and the
/// `.well-known` discovery documents) are only mounted when
/// `state.oauth` is configured - an unconfigured deployment doesn't
/// advertise a capability it can't serve.
pub fn router(state: Arc<BridgeState>) -> Router {
    let mut router = Router::new()
        .route("/mcp", post(mcp::post_mcp).get(mcp::get_mcp).delete(mcp::delete_mcp))
        .route("/files/{key}", get(files::get_file))
        .route("/health", get(health::get_health));

    if state.oauth.is_some() {
        router = router
            .route("/oauth/token", post(oauth::post_token))
            .route(
                "/.well-known/oauth-authorization-server",
                get(oauth::get_authorization_server_metadata),
            )
            .route(
                "/.well-known/openid-configuration",
                get(oauth::get_openid_configuration),
            )
            .route(
                "/.well-known/oauth-protected-resource",
                get(oauth::get_protected_resource_metadata),
            )
            .route(
                "/.well-known/oauth-protected-resource/{*suffix}",
                get(oauth::get_protected_resource_metadata),
            );
    }

    router.with_state(state)
}
