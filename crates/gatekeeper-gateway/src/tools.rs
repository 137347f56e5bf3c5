//! `tools/list` and `tools/call` request handling (spec §4.11).

use crate::exec::{self, ExecError};
use crate::registry::ToolRegistry;
use gatekeeper_auth::ApiKeyRecord;
use gatekeeper_policy::{evaluate_args, filter_env};
use gatekeeper_protocol::content::{ContentBlock, ToolCallResult};
use gatekeeper_protocol::error::GatewayError;
use gatekeeper_protocol::metrics::GatewayMetrics;
use gatekeeper_protocol::tool::ToolDescriptor;
use gatekeeper_sandbox::SandboxConfig;
use serde_json::Value;
use std::time::Duration;

/// `tools/list` result body: `{"tools": [<tool summary>, ...]}`.
pub fn list(registry: &ToolRegistry, api_key: Option<&ApiKeyRecord>) -> Value {
    let tools: Vec<Value> = registry
        .visible_to(api_key)
        .into_iter()
        .map(tool_summary)
        .collect();
    serde_json::json!({ "tools": tools })
}

fn tool_summary(tool: &ToolDescriptor) -> Value {
    serde_json::json!({
        "name": tool.name,
        "description": tool.description,
        "ui": {
            "type": tool.ui_type,
            "template": tool.ui_template,
            "config": tool.ui_config,
        },
    })
}

struct CallArgs {
    args: Vec<String>,
    env: Vec<(String, String)>,
}

/// Pulls `arguments.args` (array of strings) and `arguments.env` (object of
/// string values) out of the `tools/call` params, per spec §4.11 step 2.
fn parse_call_args(params: &Value) -> CallArgs {
    let arguments = params.get("arguments");
    let args = arguments
        .and_then(|a| a.get("args"))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let env = arguments
        .and_then(|a| a.get("env"))
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default();
    CallArgs { args, env }
}

/// Executes a `tools/call` request end to end: lookup, policy evaluation,
/// sandbox wrapping, bounded execution, and result framing. Never returns
/// a JSON-RPC error for a policy deny or a nonzero exit - both surface as
/// `isError:true` inside the returned `ToolCallResult` (spec §4.11 step 3,
/// step 7).
pub async fn call(
    registry: &ToolRegistry,
    sandbox_config: &SandboxConfig,
    name: &str,
    params: &Value,
    metrics: &GatewayMetrics,
) -> Result<ToolCallResult, GatewayError> {
    let tool = registry
        .get(name)
        .ok_or_else(|| GatewayError::InvalidParams("Unknown tool".to_string()))?;

    metrics.record_tool_call();
    let call_args = parse_call_args(params);

    let decision = evaluate_args(tool, &call_args.args);
    if !decision.allowed {
        metrics.record_policy_denied();
        return Ok(ToolCallResult::denied(&decision.reason));
    }

    let supplied_keys: Vec<String> = call_args.env.iter().map(|(k, _)| k.clone()).collect();
    let kept_keys = filter_env(&tool.allowed_env_keys, &supplied_keys);
    let env: Vec<(String, String)> = call_args
        .env
        .into_iter()
        .filter(|(k, _)| kept_keys.contains(k))
        .collect();

    let cwd = std::env::current_dir().map_err(GatewayError::Io)?;
    let plan = gatekeeper_sandbox::wrap(sandbox_config, tool, &cwd, &call_args.args, &env)
        .map_err(|e| GatewayError::Sandbox(e.to_string()))?;

    let timeout = Duration::from_millis(tool.timeout_ms);
    let outcome = exec::execute(&plan, timeout).await.map_err(|e| match e {
        ExecError::Spawn(io) => GatewayError::Sandbox(io.to_string()),
        ExecError::Sandbox(se) => GatewayError::Sandbox(se.to_string()),
    })?;

    if outcome.timed_out {
        metrics.record_sandbox_timeout();
    }
    let is_error = outcome.timed_out || outcome.exit_code != 0;
    let result = ToolCallResult {
        content: vec![
            ContentBlock::text(outcome.stdout),
            ContentBlock::text(outcome.stderr),
        ],
        is_error,
        _meta: None,
    }
    .with_meta(serde_json::json!({ "exit_code": outcome.exit_code }));

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekeeper_protocol::tool::{PluginFile, SandboxMode, DEFAULT_TIMEOUT_MS};

    fn registry_with(tool: ToolDescriptor) -> ToolRegistry {
        ToolRegistry::load(PluginFile { tools: vec![tool] }).unwrap()
    }

    fn echo_tool(allowed_arg_globs: Vec<String>) -> ToolDescriptor {
        ToolDescriptor {
            name: "echo".into(),
            description: "echoes argv".into(),
            command: "/bin/echo".into(),
            args: vec![],
            allowed_arg_globs,
            allowed_env_keys: vec![],
            sandbox: SandboxMode::None,
            wasm_binary: None,
            network: false,
            ui_type: None,
            ui_template: None,
            ui_config: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    fn sandbox_config(root: &std::path::Path) -> SandboxConfig {
        SandboxConfig {
            root_dir: root.to_path_buf(),
            wasm_dir: root.join("wasm"),
        }
    }

    #[tokio::test]
    async fn unknown_tool_is_invalid_params_not_denied() {
        let registry = registry_with(echo_tool(vec![]));
        let dir = tempfile::tempdir().unwrap();
        let config = sandbox_config(dir.path());
        let params = serde_json::json!({"name": "missing", "arguments": {}});
        let metrics = GatewayMetrics::default();
        let err = call(&registry, &config, "missing", &params, &metrics).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidParams(msg) if msg == "Unknown tool"));
    }

    #[tokio::test]
    async fn allowed_call_runs_and_reports_exit_code() {
        let registry = registry_with(echo_tool(vec!["hello *".to_string()]));
        let dir = tempfile::tempdir().unwrap();
        let config = sandbox_config(dir.path());
        let params = serde_json::json!({
            "name": "echo",
            "arguments": {"args": ["hello", "world"]},
        });
        let metrics = GatewayMetrics::default();
        let result = call(&registry, &config, "echo", &params, &metrics).await.unwrap();
        assert!(!result.is_error);
        let ContentBlock::Text { text } = &result.content[0] else {
            panic!("expected text content");
        };
        assert_eq!(text, "hello world\n");
        assert_eq!(result._meta.unwrap()["exit_code"], 0);
    }

    #[tokio::test]
    async fn denied_call_never_spawns_a_process() {
        let registry = registry_with(echo_tool(vec!["hello *".to_string()]));
        let dir = tempfile::tempdir().unwrap();
        let config = sandbox_config(dir.path());
        let params = serde_json::json!({
            "name": "echo",
            "arguments": {"args": ["goodbye"]},
        });
        let metrics = GatewayMetrics::default();
        let result = call(&registry, &config, "echo", &params, &metrics).await.unwrap();
        assert!(result.is_error);
        assert_eq!(metrics.policy_denied_total(), 1);
        let ContentBlock::Text { text } = &result.content[0] else {
            panic!("expected text content");
        };
        assert!(text.starts_with("DENIED:"));
    }

    #[test]
    fn list_filters_by_api_key_visibility() {
        let registry = registry_with(echo_tool(vec![]));
        let key = ApiKeyRecord {
            key_id: "k".into(),
            label: "ci".into(),
            visible_tools: Some(vec![]),
        };
        let body = list(&registry, Some(&key));
        assert_eq!(body["tools"].as_array().unwrap().len(), 0);
        let body_unscoped = list(&registry, None);
        assert_eq!(body_unscoped["tools"].as_array().unwrap().len(), 1);
    }
}
