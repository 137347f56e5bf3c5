//! Classic HTTP JSON-RPC surface for the tool-execution gateway (spec
//! §6 "Wire - classic HTTP JSON-RPC"): a single `POST /mcp`, auth via
//! `Authorization: Bearer <api-key>`. Once a request reaches the JSON-RPC
//! envelope stage it always answers HTTP 200 with `{result}`/`{error}` in
//! the body; failures that short-circuit before that - unauthenticated
//! (401) or rate-limited (429, spec §7) - ride home as a bare HTTP status
//! instead.

use crate::dispatch::{self, GatewayState};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use gatekeeper_auth::ApiKeyRecord;
use gatekeeper_protocol::jsonrpc::JsonRpcRequest;
use serde_json::{json, Value};
use std::sync::Arc;

pub async fn post_mcp(State(state): State<Arc<GatewayState>>, headers: HeaderMap, body: axum::body::Bytes) -> Response {
    let api_key = match authenticate(&state, &headers).await {
        Ok(key) => key,
        Err(response) => return response,
    };

    // Rate limiting short-circuits before a JSON-RPC body exists at all, so
    // it rides home as a bare HTTP status (spec §7 "Rate — HTTP 429"), not
    // an embedded JSON-RPC error the way stdio mode's `handle_request`
    // reports it (stdio has no HTTP status to give).
    if !dispatch::check_rate_limit(&state, api_key.as_ref()) {
        let status = gatekeeper_protocol::error::GatewayError::RateLimited
            .http_status()
            .expect("RateLimited always maps to an HTTP status");
        return StatusCode::from_u16(status).unwrap_or(StatusCode::TOO_MANY_REQUESTS).into_response();
    }

    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            return Json(json!({
                "jsonrpc": "2.0",
                "id": Value::Null,
                "error": { "code": -32700, "message": format!("Parse error: {e}") },
            }))
            .into_response();
        }
    };

    Json(dispatch::handle_request_unchecked(&state, &request, api_key.as_ref()).await).into_response()
}

/// `None` (no auth configured) and `Some(record)` (a matched key) both
/// proceed; a missing or unmatched bearer token is a 401, same contract
/// the bridge's `auth::authenticate` uses for the Streamable-HTTP surface.
async fn authenticate(state: &GatewayState, headers: &HeaderMap) -> Result<Option<ApiKeyRecord>, Response> {
    let Some(store) = &state.api_keys else {
        return Ok(None);
    };
    let raw = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(unauthorized)?;
    let token = gatekeeper_auth::extract_bearer(raw).map_err(|_| unauthorized())?;
    store.lookup(token).await.map(Some).ok_or_else(unauthorized)
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, "unauthorized").into_response()
}

pub fn router(state: Arc<GatewayState>) -> axum::Router {
    axum::Router::new()
        .route("/mcp", axum::routing::post(post_mcp))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ToolRegistry;
    use gatekeeper_auth::audit::TracingAuditSink;
    use gatekeeper_auth::{ApiKeyRecord, InMemoryApiKeyStore};
    use gatekeeper_policy::RateLimiterRegistry;
    use gatekeeper_protocol::tool::{PluginFile, SandboxMode, ToolDescriptor, DEFAULT_TIMEOUT_MS};
    use gatekeeper_sandbox::SandboxConfig;
    use gatekeeper_store::{ExternalizerConfig, FileStore};
    use std::time::Duration;
    use tower::ServiceExt;

    fn state(dir: &std::path::Path, api_keys: Option<Arc<dyn gatekeeper_auth::ApiKeyStore>>) -> Arc<GatewayState> {
        let tool = ToolDescriptor {
            name: "echo".into(),
            description: String::new(),
            command: "/bin/echo".into(),
            args: vec![],
            allowed_arg_globs: vec![],
            allowed_env_keys: vec![],
            sandbox: SandboxMode::None,
            wasm_binary: None,
            network: false,
            ui_type: None,
            ui_template: None,
            ui_config: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        };
        Arc::new(GatewayState {
            registry: ToolRegistry::load(PluginFile { tools: vec![tool] }).unwrap(),
            sandbox_config: SandboxConfig {
                root_dir: dir.to_path_buf(),
                wasm_dir: dir.join("wasm"),
            },
            store: FileStore::new(dir.join("store")),
            externalizer_config: ExternalizerConfig::new("localhost", dir.to_path_buf()),
            rate_limiter: RateLimiterRegistry::new(1000, Duration::from_secs(60)),
            audit: Arc::new(TracingAuditSink),
            server_name: "gatekeeper".into(),
            server_version: "0.1.0".into(),
            api_keys,
            metrics: gatekeeper_protocol::metrics::GatewayMetrics::default(),
        })
    }

    #[tokio::test]
    async fn unauthenticated_request_is_rejected_when_keys_are_configured() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(state(dir.path(), Some(Arc::new(InMemoryApiKeyStore::new()))));
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn request_with_no_auth_configured_is_answered_directly() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(state(dir.path(), None));
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["result"]["tools"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn valid_key_is_scoped_to_its_visible_tools() {
        let dir = tempfile::tempdir().unwrap();
        let store = InMemoryApiKeyStore::new();
        store
            .insert(
                "secret".to_string(),
                ApiKeyRecord {
                    key_id: "k1".to_string(),
                    label: "ci".to_string(),
                    visible_tools: Some(vec![]),
                },
            )
            .await;
        let app = router(state(dir.path(), Some(Arc::new(store))));
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("content-type", "application/json")
            .header("authorization", "Bearer secret")
            .body(axum::body::Body::from(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["result"]["tools"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn rate_limited_request_is_a_bare_429_not_a_200_with_an_error_body() {
        let dir = tempfile::tempdir().unwrap();
        let mut gateway_state = state(dir.path(), None);
        Arc::get_mut(&mut gateway_state).unwrap().rate_limiter =
            RateLimiterRegistry::new(0, Duration::from_secs(60));
        let app = router(gateway_state);
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
