//! The tool descriptor: the immutable-after-load configuration record a
//! plugin file contributes per tool.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxMode {
    None,
    Bubblewrap,
    Wasm,
    /// Resolved to `Bubblewrap` or `None` at startup based on whether a
    /// `bwrap` binary is on the executor's `PATH`; never appears after load.
    Auto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,

    /// Ordered list of glob patterns matched against the space-joined argv.
    /// Empty means "no restriction".
    #[serde(default)]
    pub allowed_arg_globs: Vec<String>,

    /// Glob patterns matched against env-var names. Empty means "pass
    /// none" is the documented default; see `gatekeeper-policy::filter_env`.
    #[serde(default)]
    pub allowed_env_keys: Vec<String>,

    #[serde(default = "default_sandbox")]
    pub sandbox: SandboxMode,

    /// Required iff `sandbox == Wasm`; path relative to the configured
    /// WASM directory.
    #[serde(default)]
    pub wasm_binary: Option<String>,

    /// Whether the sandbox should grant network access (`bwrap --share-net`).
    #[serde(default)]
    pub network: bool,

    #[serde(default)]
    pub ui_type: Option<String>,
    #[serde(default)]
    pub ui_template: Option<String>,
    #[serde(default)]
    pub ui_config: Option<Value>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_sandbox() -> SandboxMode {
    SandboxMode::None
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ToolValidationError {
    #[error("tool `{name}`: sandbox=wasm requires a non-empty wasm_binary")]
    MissingWasmBinary { name: String },
    #[error("tool `{name}`: invalid glob pattern `{pattern}`: {reason}")]
    InvalidGlob {
        name: String,
        pattern: String,
        reason: String,
    },
}

/// A plugin file's top-level shape: `{"tools": [...]}`. Unknown fields in
/// either the envelope or per-tool objects are ignored by serde's default
/// behavior (no `deny_unknown_fields`).
#[derive(Debug, Clone, Deserialize)]
pub struct PluginFile {
    pub tools: Vec<ToolDescriptor>,
}
