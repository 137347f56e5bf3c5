//! The immutable-after-load tool catalog (spec §3 Tool descriptor).

use gatekeeper_auth::ApiKeyRecord;
use gatekeeper_policy::validate_tool;
use gatekeeper_protocol::tool::{PluginFile, ToolDescriptor, ToolValidationError};
use std::collections::HashMap;

pub struct ToolRegistry {
    tools: HashMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    /// Validates every tool in `file.tools` (globs compile, the wasm
    /// invariant holds) before accepting the catalog - a configuration
    /// error here is fatal at startup (spec §7).
    pub fn load(file: PluginFile) -> Result<ToolRegistry, ToolValidationError> {
        let mut tools = HashMap::with_capacity(file.tools.len());
        for tool in file.tools {
            validate_tool(&tool)?;
            tools.insert(tool.name.clone(), tool);
        }
        Ok(ToolRegistry { tools })
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    /// Tools visible to the caller identified by `api_key`, or every tool
    /// when no caller scoping applies (stdio mode, or classic HTTP with
    /// auth disabled).
    pub fn visible_to(&self, api_key: Option<&ApiKeyRecord>) -> Vec<&ToolDescriptor> {
        self.tools
            .values()
            .filter(|tool| api_key.is_none_or(|key| key.can_see(&tool.name)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plugin_file(names: &[&str]) -> PluginFile {
        PluginFile {
            tools: names
                .iter()
                .map(|name| ToolDescriptor {
                    name: name.to_string(),
                    description: String::new(),
                    command: "/bin/echo".to_string(),
                    args: vec![],
                    allowed_arg_globs: vec![],
                    allowed_env_keys: vec![],
                    sandbox: gatekeeper_protocol::tool::SandboxMode::None,
                    wasm_binary: None,
                    network: false,
                    ui_type: None,
                    ui_template: None,
                    ui_config: None,
                    timeout_ms: gatekeeper_protocol::tool::DEFAULT_TIMEOUT_MS,
                })
                .collect(),
        }
    }

    #[test]
    fn loads_and_looks_up_by_name() {
        let registry = ToolRegistry::load(plugin_file(&["echo", "cat"])).unwrap();
        assert!(registry.get("echo").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn visible_to_none_returns_every_tool() {
        let registry = ToolRegistry::load(plugin_file(&["echo", "cat"])).unwrap();
        assert_eq!(registry.visible_to(None).len(), 2);
    }

    #[test]
    fn visible_to_scoped_key_filters_tools() {
        let registry = ToolRegistry::load(plugin_file(&["echo", "cat"])).unwrap();
        let key = ApiKeyRecord {
            key_id: "k1".to_string(),
            label: "ci".to_string(),
            visible_tools: Some(vec!["echo".to_string()]),
        };
        let visible = registry.visible_to(Some(&key));
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "echo");
    }
}
