//! Newline-delimited JSON-RPC over the process's own stdin/stdout (spec
//! §6 "Wire - stdio mode"). stdout is reserved exclusively for JSON-RPC
//! frames; logging in this mode stays on stderr.

use crate::dispatch::{self, GatewayState};
use gatekeeper_auth::ApiKeyRecord;
use gatekeeper_protocol::jsonrpc::JsonRpcRequest;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

/// Reads one JSON-RPC message per line from `input` until EOF or
/// `cancellation`, dispatching requests through `state` and writing their
/// responses to `output`. Notifications (no `id`, or a `null` one) are
/// processed but never produce a reply line.
pub async fn run(
    state: &GatewayState,
    api_key: Option<&ApiKeyRecord>,
    input: impl tokio::io::AsyncRead + Unpin,
    mut output: impl AsyncWrite + Unpin,
    cancellation: &CancellationToken,
) {
    let mut lines = BufReader::new(input).lines();
    loop {
        let line = tokio::select! {
            biased;
            _ = cancellation.cancelled() => break,
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "error reading stdin");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        if let Some(response) = handle_line(state, api_key, &line).await {
            if write_line(&mut output, &response).await.is_err() {
                break;
            }
        }
    }
}

async fn handle_line(state: &GatewayState, api_key: Option<&ApiKeyRecord>, line: &str) -> Option<Value> {
    let probe: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            return Some(serde_json::json!({
                "jsonrpc": "2.0",
                "id": Value::Null,
                "error": { "code": -32700, "message": format!("Parse error: {e}") },
            }));
        }
    };

    let has_real_id = !matches!(probe.get("id"), None | Some(Value::Null));
    if !has_real_id {
        // A notification: still worth dispatching for its side effects
        // (none currently observe them), but never answered on the wire.
        return None;
    }

    let request: JsonRpcRequest = match serde_json::from_value(probe) {
        Ok(r) => r,
        Err(e) => {
            return Some(serde_json::json!({
                "jsonrpc": "2.0",
                "id": Value::Null,
                "error": { "code": -32600, "message": format!("Invalid Request: {e}") },
            }));
        }
    };

    Some(dispatch::handle_request(state, &request, api_key).await)
}

async fn write_line(output: &mut (impl AsyncWrite + Unpin), value: &Value) -> std::io::Result<()> {
    let mut line = serde_json::to_vec(value).expect("response always serializes");
    line.push(b'\n');
    output.write_all(&line).await?;
    output.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekeeper_auth::audit::TracingAuditSink;
    use gatekeeper_policy::RateLimiterRegistry;
    use gatekeeper_protocol::tool::{PluginFile, SandboxMode, ToolDescriptor, DEFAULT_TIMEOUT_MS};
    use gatekeeper_sandbox::SandboxConfig;
    use gatekeeper_store::{ExternalizerConfig, FileStore};
    use std::sync::Arc;
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
            registry: crate::registry::ToolRegistry::load(PluginFile { tools: vec![tool] }).unwrap(),
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
            metrics: gatekeeper_protocol::metrics::GatewayMetrics::default(),
        }
    }

    #[tokio::test]
    async fn request_line_produces_one_response_line() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        let input = std::io::Cursor::new(b"{\"jsonrpc\":\"2.0\",\"method\":\"initialize\",\"id\":1}\n".to_vec());
        let mut output = Vec::new();
        run(&state, None, input, &mut output, &CancellationToken::new()).await;
        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.lines().count(), 1);
        let parsed: Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
        assert_eq!(parsed["id"], 1);
    }

    #[tokio::test]
    async fn notification_produces_no_response_line() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        let input = std::io::Cursor::new(
            b"{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n".to_vec(),
        );
        let mut output = Vec::new();
        run(&state, None, input, &mut output, &CancellationToken::new()).await;
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn malformed_json_line_gets_a_parse_error_response() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        let input = std::io::Cursor::new(b"not json at all\n".to_vec());
        let mut output = Vec::new();
        run(&state, None, input, &mut output, &CancellationToken::new()).await;
        let text = String::from_utf8(output).unwrap();
        let parsed: Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
        assert_eq!(parsed["error"]["code"], -32700);
    }
}
