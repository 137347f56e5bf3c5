//! Policy evaluation: argument allow-lists, environment-variable
//! filtering, and load-time tool validation (spec §4.3).

use crate::glob::{self, Matcher};
use gatekeeper_protocol::tool::{SandboxMode, ToolDescriptor, ToolValidationError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub reason: String,
    pub matched_rules: Vec<String>,
}

impl Decision {
    fn allow(reason: impl Into<String>, matched_rules: Vec<String>) -> Self {
        Decision {
            allowed: true,
            reason: reason.into(),
            matched_rules,
        }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Decision {
            allowed: false,
            reason: reason.into(),
            matched_rules: Vec::new(),
        }
    }
}

/// Evaluates `argv` against `tool.allowed_arg_globs`. Patterns are tried in
/// order; the first match wins. An empty allow-list means no restriction.
pub fn evaluate_args(tool: &ToolDescriptor, argv: &[String]) -> Decision {
    if tool.allowed_arg_globs.is_empty() {
        return Decision::allow("no argument restrictions", Vec::new());
    }
    let joined = argv.join(" ");
    for pattern in &tool.allowed_arg_globs {
        match glob::matches(pattern, &joined) {
            Ok(true) => {
                return Decision::allow(
                    format!("matched pattern `{pattern}`"),
                    vec![format!("arg_allow:{pattern}")],
                );
            }
            Ok(false) => continue,
            // A pattern that fails to compile can never match; load-time
            // validation should have already rejected it, so this is
            // reached only for patterns added after load without revalidation.
            Err(_) => continue,
        }
    }
    Decision::deny("arguments not in allowed patterns")
}

/// Filters `supplied_keys` against `allowed_patterns`. An empty allow-list
/// passes every supplied key through unchanged - it restricts, it never
/// widens what the caller explicitly supplied.
pub fn filter_env(allowed_patterns: &[String], supplied_keys: &[String]) -> Vec<String> {
    if allowed_patterns.is_empty() {
        return supplied_keys.to_vec();
    }
    let compiled: Vec<Matcher> = allowed_patterns
        .iter()
        .filter_map(|p| glob::compile(p).ok())
        .collect();
    supplied_keys
        .iter()
        .filter(|key| compiled.iter().any(|m| m.is_match(key)))
        .cloned()
        .collect()
}

/// Validates a tool descriptor at load time: every glob compiles, the
/// sandbox mode is one of the known variants (enforced by `SandboxMode`'s
/// own closed enum at the type level), and `sandbox=wasm` implies a
/// non-empty `wasm_binary`.
pub fn validate_tool(tool: &ToolDescriptor) -> Result<(), ToolValidationError> {
    for pattern in tool.allowed_arg_globs.iter().chain(&tool.allowed_env_keys) {
        if let Err(e) = glob::compile(pattern) {
            return Err(ToolValidationError::InvalidGlob {
                name: tool.name.clone(),
                pattern: pattern.clone(),
                reason: e.to_string(),
            });
        }
    }
    if tool.sandbox == SandboxMode::Wasm
        && tool.wasm_binary.as_deref().unwrap_or("").is_empty()
    {
        return Err(ToolValidationError::MissingWasmBinary {
            name: tool.name.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool_with_globs(globs: &[&str]) -> ToolDescriptor {
        ToolDescriptor {
            name: "echo".into(),
            description: String::new(),
            command: "/bin/echo".into(),
            args: vec![],
            allowed_arg_globs: globs.iter().map(|s| s.to_string()).collect(),
            allowed_env_keys: vec![],
            sandbox: SandboxMode::None,
            wasm_binary: None,
            network: false,
            ui_type: None,
            ui_template: None,
            ui_config: None,
            timeout_ms: 30_000,
        }
    }

    #[test]
    fn empty_allow_list_allows_everything() {
        let tool = tool_with_globs(&[]);
        let decision = evaluate_args(&tool, &["anything".into(), "goes".into()]);
        assert!(decision.allowed);
        assert!(decision.matched_rules.is_empty());
    }

    #[test]
    fn scenario_allowed_and_denied_from_spec() {
        let tool = tool_with_globs(&["hello *"]);
        let allowed = evaluate_args(&tool, &["hello".into(), "world".into()]);
        assert!(allowed.allowed);
        assert_eq!(allowed.matched_rules, vec!["arg_allow:hello *"]);

        let denied = evaluate_args(&tool, &["goodbye".into()]);
        assert!(!denied.allowed);
        assert_eq!(denied.reason, "arguments not in allowed patterns");
    }

    #[test]
    fn filter_env_passes_through_when_no_patterns_configured() {
        let kept = filter_env(&[], &["PATH".into(), "HOME".into()]);
        assert_eq!(kept, vec!["PATH".to_string(), "HOME".to_string()]);
    }

    #[test]
    fn filter_env_keeps_only_matching_keys() {
        let patterns = vec!["PATH".to_string(), "MY_*".to_string()];
        let kept = filter_env(&patterns, &["PATH".into(), "HOME".into(), "MY_TOKEN".into()]);
        assert_eq!(kept, vec!["PATH".to_string(), "MY_TOKEN".to_string()]);
    }

    #[test]
    fn validate_tool_rejects_wasm_without_binary() {
        let mut tool = tool_with_globs(&[]);
        tool.sandbox = SandboxMode::Wasm;
        tool.wasm_binary = None;
        assert_eq!(
            validate_tool(&tool),
            Err(ToolValidationError::MissingWasmBinary {
                name: "echo".into()
            })
        );
    }

    #[test]
    fn validate_tool_rejects_unbalanced_glob() {
        let tool = tool_with_globs(&["[unterminated"]);
        assert!(validate_tool(&tool).is_err());
    }
}
