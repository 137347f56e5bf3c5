//! Command-line flags for `mcp-gatekeeper` (spec §1 lists flag parsing and
//! filesystem existence checks for configured paths as out-of-scope core
//! concerns - this module is where that wiring actually lives).

use clap::{Args, Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mcp-gatekeeper")]
#[command(author, version, about = "Policy-enforcing gateway for the Model Context Protocol")]
pub struct Cli {
    #[command(subcommand)]
    pub mode: Mode,

    /// Log level (`error`, `warn`, `info`, `debug`, `trace`).
    #[arg(long, global = true, default_value = "info", env = "GATEKEEPER_LOG")]
    pub log_level: String,

    /// Emit logs as JSON lines instead of the compact human format.
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(clap::Subcommand, Debug)]
pub enum Mode {
    /// Tool-execution gateway: exposes a plugin-configured tool catalog.
    Gateway(GatewayArgs),
    /// Streamable-HTTP bridge proxy fronting an upstream stdio MCP server.
    Bridge(BridgeArgs),
}

#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum GatewayTransport {
    #[default]
    Stdio,
    Http,
}

#[derive(Args, Debug)]
pub struct GatewayArgs {
    /// `stdio` reads newline-delimited JSON-RPC on the process's own
    /// stdin/stdout; `http` serves classic HTTP JSON-RPC on `--listen`.
    #[arg(long, value_enum, default_value = "stdio")]
    pub transport: GatewayTransport,

    /// Address to bind when `--transport http` (ignored for stdio).
    #[arg(long, default_value = "127.0.0.1:8088")]
    pub listen: String,

    /// Plugin JSON file, or a directory of `*.json` plugin files, each
    /// shaped `{"tools": [...]}` (spec §6 "External plugin file format").
    #[arg(long)]
    pub plugins: PathBuf,

    /// Filesystem root every sandboxed tool invocation's `cwd` must
    /// resolve under (spec §4.4).
    #[arg(long)]
    pub root_dir: PathBuf,

    /// Directory `ToolDescriptor::wasm_binary` paths are resolved
    /// relative to, and that bubblewrap bind-mounts read-only.
    #[arg(long)]
    pub wasm_dir: Option<PathBuf>,

    /// API keys accepted on the HTTP transport, `key_id:secret` (repeat
    /// for more than one). Omit entirely to run with auth disabled.
    #[arg(long = "api-key", value_parser = parse_api_key)]
    pub api_keys: Vec<(String, String)>,

    /// Requests allowed per API key (or process-wide, if auth is
    /// disabled) within `--rate-window-secs`.
    #[arg(long, default_value_t = 120)]
    pub rate_limit: usize,
    #[arg(long, default_value_t = 60)]
    pub rate_window_secs: u64,

    /// Host used to build `/files/{key}` externalization URLs. Gateway
    /// mode has no `/files` endpoint of its own yet, but this still
    /// feeds the externalizer's size-ceiling configuration.
    #[arg(long, default_value = "localhost")]
    pub host: String,
}

#[derive(Args, Debug)]
pub struct BridgeArgs {
    /// Address to bind the bridge's HTTP listener on.
    #[arg(long, default_value = "127.0.0.1:8089")]
    pub listen: String,

    /// Upstream stdio MCP server command to spawn per session.
    #[arg(long)]
    pub upstream_command: String,
    /// Arguments passed to `--upstream-command`.
    #[arg(long = "upstream-arg")]
    pub upstream_args: Vec<String>,
    /// Working directory for the upstream process (defaults to the
    /// gateway's own cwd).
    #[arg(long)]
    pub upstream_cwd: Option<PathBuf>,

    /// Idle session TTL before the reaper evicts it.
    #[arg(long, default_value_t = 1800)]
    pub session_ttl_secs: u64,

    /// Run the full Streamable-HTTP session lifecycle. Disable to fall
    /// back to one ephemeral session per request (spec §6 classic mode).
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub require_sessions: bool,

    /// Directory externalized files are written to and read back from.
    #[arg(long)]
    pub files_dir: PathBuf,

    /// Host advertised in `/files/{key}` URLs and OAuth discovery
    /// documents.
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// API keys accepted on the bridge, `key_id:secret` (repeat for more
    /// than one). Omit to leave API-key auth disabled.
    #[arg(long = "api-key", value_parser = parse_api_key)]
    pub api_keys: Vec<(String, String)>,

    /// Enable OAuth 2.0 client-credentials auth alongside (or instead
    /// of) API keys, registering one client per `--oauth-client`.
    #[arg(long = "oauth-client", value_parser = parse_api_key)]
    pub oauth_clients: Vec<(String, String)>,
    #[arg(long, default_value_t = 3600)]
    pub oauth_access_ttl_secs: u64,

    /// Requests allowed process-wide within `--rate-window-secs` (spec
    /// §4.8 "one limiter process-wide for bridge").
    #[arg(long, default_value_t = 300)]
    pub rate_limit: usize,
    #[arg(long, default_value_t = 60)]
    pub rate_window_secs: u64,
}

fn parse_api_key(raw: &str) -> Result<(String, String), String> {
    raw.split_once(':')
        .map(|(id, secret)| (id.to_string(), secret.to_string()))
        .ok_or_else(|| format!("expected `id:secret`, got `{raw}`"))
}
