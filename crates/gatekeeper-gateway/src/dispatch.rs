//! JSON-RPC method routing for the tool-execution gateway (stdio and
//! classic HTTP JSON-RPC modes): `initialize`, `tools/list`, `tools/call`,
//! and `notifications/*`.

use crate::registry::ToolRegistry;
use crate::tools;
use futures::FutureExt;
use gatekeeper_auth::{ApiKeyRecord, ApiKeyStore, AuditSink, BridgeAuditRecord};
use gatekeeper_policy::RateLimiterRegistry;
use gatekeeper_protocol::error::GatewayError;
use gatekeeper_protocol::jsonrpc::{JsonRpcError, JsonRpcErrorCode, JsonRpcRequest, RequestId};
use gatekeeper_protocol::metrics::GatewayMetrics;
use gatekeeper_protocol::MCP_PROTOCOL_VERSION;
use gatekeeper_sandbox::SandboxConfig;
use gatekeeper_store::{externalize, ExternalizerConfig, FileStore};
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

pub struct GatewayState {
    pub registry: ToolRegistry,
    pub sandbox_config: SandboxConfig,
    pub store: FileStore,
    pub externalizer_config: ExternalizerConfig,
    pub rate_limiter: RateLimiterRegistry,
    pub audit: Arc<dyn AuditSink>,
    pub server_name: String,
    pub server_version: String,
    /// `None` means the deployment has no API-key auth configured (stdio
    /// mode, or classic HTTP with auth disabled) - `tools/list`/rate
    /// limiting then run unscoped (spec §3 Gateway session).
    pub api_keys: Option<Arc<dyn ApiKeyStore>>,
    pub metrics: GatewayMetrics,
}

fn rate_limit_key(api_key: Option<&ApiKeyRecord>) -> &str {
    api_key.map(|k| k.key_id.as_str()).unwrap_or("_unscoped")
}

/// Checks and consumes the caller's rate-limit budget. Exposed separately
/// from `handle_request` so the classic-HTTP surface (`http::post_mcp`)
/// can answer a denial with `StatusCode::TOO_MANY_REQUESTS` (spec §7
/// "Rate — HTTP 429") instead of an embedded JSON-RPC error, the way
/// stdio mode (which has no HTTP status to give) does via `handle_request`
/// below.
pub fn check_rate_limit(state: &GatewayState, api_key: Option<&ApiKeyRecord>) -> bool {
    state.rate_limiter.allow(rate_limit_key(api_key))
}

/// Dispatches one JSON-RPC request, producing a `{result}` or `{error}`
/// payload but never panicking on malformed input. `api_key` scopes both
/// rate limiting and `tools/list` visibility; `None` for stdio mode or
/// classic HTTP with auth disabled. A panic anywhere in the match below is
/// caught at this single seam and turned into an internal-error reply
/// rather than taking the whole connection down with it (spec §7).
///
/// Rate-limits internally and reports a denial as an embedded JSON-RPC
/// error; callers that can express the denial as an HTTP status (classic
/// HTTP) should call `check_rate_limit` themselves first and dispatch
/// through `handle_request_unchecked` instead.
pub async fn handle_request(
    state: &GatewayState,
    request: &JsonRpcRequest,
    api_key: Option<&ApiKeyRecord>,
) -> Value {
    if !check_rate_limit(state, api_key) {
        return error_response(
            &request.id,
            JsonRpcError::new(JsonRpcErrorCode::InvalidRequest.code(), "rate limited"),
        );
    }
    handle_request_unchecked(state, request, api_key).await
}

/// `handle_request` minus the rate-limit check - for callers that already
/// performed (and acted on) `check_rate_limit` themselves.
pub async fn handle_request_unchecked(
    state: &GatewayState,
    request: &JsonRpcRequest,
    api_key: Option<&ApiKeyRecord>,
) -> Value {
    let started = Instant::now();
    let result = match AssertUnwindSafe(dispatch_method(state, request, api_key))
        .catch_unwind()
        .await
    {
        Ok(result) => result,
        Err(_panic) => Err(GatewayError::Sandbox("internal error".to_string())),
    };

    let duration_ms = started.elapsed().as_millis() as u64;
    let response = match result {
        Ok(value) => success_response(&request.id, value),
        Err(ref e) => error_response(&request.id, e.to_jsonrpc_error()),
    };

    audit(state, request, &response, duration_ms).await;
    response
}

async fn dispatch_method(
    state: &GatewayState,
    request: &JsonRpcRequest,
    api_key: Option<&ApiKeyRecord>,
) -> Result<Value, GatewayError> {
    match request.method.as_str() {
        "initialize" => Ok(initialize_result(state)),
        "tools/list" => Ok(tools::list(&state.registry, api_key)),
        "tools/call" => handle_tools_call(state, request).await,
        other => Err(GatewayError::MethodNotFound(other.to_string())),
    }
}

async fn handle_tools_call(state: &GatewayState, request: &JsonRpcRequest) -> Result<Value, GatewayError> {
    let params = request
        .params
        .clone()
        .ok_or_else(|| GatewayError::InvalidParams("missing params".to_string()))?;
    let name = params
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| GatewayError::InvalidParams("missing tool name".to_string()))?
        .to_string();

    let result = tools::call(&state.registry, &state.sandbox_config, &name, &params, &state.metrics).await?;
    let externalized = externalize(&state.store, &state.externalizer_config, result)
        .await
        .map_err(|_| GatewayError::ResponseTooLarge)?;
    serde_json::to_value(externalized).map_err(GatewayError::Json)
}

fn initialize_result(state: &GatewayState) -> Value {
    serde_json::json!({
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "capabilities": { "tools": {} },
        "serverInfo": { "name": state.server_name, "version": state.server_version },
    })
}

fn success_response(id: &RequestId, result: Value) -> Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result,
    })
}

fn error_response(id: &RequestId, error: JsonRpcError) -> Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": error.code, "message": error.message, "data": error.data },
    })
}

async fn audit(state: &GatewayState, request: &JsonRpcRequest, response: &Value, duration_ms: u64) {
    let (response_field, error_field) = if response.get("error").is_some() {
        (None, response.get("error").cloned())
    } else {
        (response.get("result").cloned(), None)
    };
    let record = BridgeAuditRecord {
        method: request.method.clone(),
        params: request.params.clone(),
        response: response_field,
        error: error_field,
        request_size: request.params.as_ref().map(|p| p.to_string().len()).unwrap_or(0),
        response_size: response.to_string().len(),
        duration_ms,
        created_at: chrono::Utc::now(),
    };
    state.audit.record(record).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekeeper_auth::audit::TracingAuditSink;
    use gatekeeper_protocol::tool::{PluginFile, SandboxMode, ToolDescriptor, DEFAULT_TIMEOUT_MS};
    use std::time::Duration;

    fn state(dir: &std::path::Path) -> GatewayState {
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
        GatewayState {
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
            api_keys: None,
            metrics: GatewayMetrics::default(),
        }
    }

    #[tokio::test]
    async fn initialize_reports_protocol_version() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        let req = JsonRpcRequest::new(RequestId::Number(1), "initialize", None);
        let response = handle_request(&state, &req, None).await;
        assert_eq!(response["result"]["protocolVersion"], MCP_PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        let req = JsonRpcRequest::new(RequestId::Number(1), "totally/unknown", None);
        let response = handle_request(&state, &req, None).await;
        assert_eq!(response["error"]["code"], JsonRpcErrorCode::MethodNotFound.code());
    }

    #[tokio::test]
    async fn tools_call_routes_through_policy_and_exec() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        let params = serde_json::json!({"name": "echo", "arguments": {"args": ["hi"]}});
        let req = JsonRpcRequest::new(RequestId::Number(1), "tools/call", Some(params));
        let response = handle_request(&state, &req, None).await;
        assert_eq!(response["result"]["isError"], false);
        assert_eq!(state.metrics.tools_called_total(), 1);
    }

    #[tokio::test]
    async fn rate_limited_caller_gets_an_error_without_reaching_tools() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state(dir.path());
        state.rate_limiter = RateLimiterRegistry::new(0, Duration::from_secs(60));
        let req = JsonRpcRequest::new(RequestId::Number(1), "tools/list", None);
        let response = handle_request(&state, &req, None).await;
        assert!(response.get("error").is_some());
    }
}
