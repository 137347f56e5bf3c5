//! Transforms `(tool, cwd, argv, env)` into something executable under
//! one of three sandbox modes (spec §4.4): `none`, `bubblewrap`, `wasm`.

pub mod bubblewrap;
pub mod error;
pub mod path;
pub mod wasm;

pub use error::SandboxError;
pub use wasm::WasmOutcome;

use gatekeeper_policy::filter_env;
use gatekeeper_protocol::tool::{SandboxMode, ToolDescriptor};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct SandboxConfig {
    pub root_dir: PathBuf,
    pub wasm_dir: PathBuf,
}

/// What the gateway should actually execute, once sandboxing has been
/// applied. `Wasm` is executed in-process via `wasm::run`; `Process` is
/// handed to `gatekeeper-rpc`/the gateway's subprocess spawner.
#[derive(Debug, Clone)]
pub enum ExecPlan {
    Process {
        command: String,
        args: Vec<String>,
        env: Vec<(String, String)>,
        cwd: PathBuf,
        stderr_tag: String,
    },
    Wasm {
        binary_path: PathBuf,
        args: Vec<String>,
        env: Vec<(String, String)>,
        root_dir: PathBuf,
        wasm_dir: PathBuf,
        cwd: PathBuf,
        stderr_tag: String,
    },
}

/// Builds the `ExecPlan` for invoking `tool` with `argv` in `cwd`. Every
/// mode first validates `cwd` against `config.root_dir`; `SandboxMode::Auto`
/// resolves to `Bubblewrap` iff `bwrap` is resolvable on `PATH`, else `None`.
pub fn wrap(
    config: &SandboxConfig,
    tool: &ToolDescriptor,
    cwd: &Path,
    argv: &[String],
    env_in: &[(String, String)],
) -> Result<ExecPlan, SandboxError> {
    let resolved_cwd = path::validate_cwd(cwd, &config.root_dir)?;

    let supplied_keys: Vec<String> = env_in.iter().map(|(k, _)| k.clone()).collect();
    let kept_keys = filter_env(&tool.allowed_env_keys, &supplied_keys);
    let mut kept_env: Vec<(String, String)> = env_in
        .iter()
        .filter(|(k, _)| kept_keys.contains(k))
        .cloned()
        .collect();

    match resolve_mode(tool.sandbox) {
        SandboxMode::None => {
            if !kept_env.iter().any(|(k, _)| k == "PATH") {
                if let Some(path) = std::env::var_os("PATH") {
                    kept_env.push(("PATH".to_string(), path.to_string_lossy().into_owned()));
                }
            }
            Ok(ExecPlan::Process {
                command: tool.command.clone(),
                args: argv.to_vec(),
                env: kept_env,
                cwd: resolved_cwd,
                stderr_tag: tool.name.clone(),
            })
        }
        SandboxMode::Bubblewrap => {
            if !bubblewrap::bwrap_available() {
                return Err(SandboxError::BwrapNotFound);
            }
            let plan = bubblewrap::build_argv(
                &tool.command,
                argv,
                &resolved_cwd,
                tool.network,
                &kept_env,
                &config.root_dir,
                Some(&config.wasm_dir),
            );
            Ok(ExecPlan::Process {
                command: plan.command,
                args: plan.args,
                env: kept_env,
                cwd: resolved_cwd,
                stderr_tag: tool.name.clone(),
            })
        }
        SandboxMode::Wasm => {
            let binary = tool
                .wasm_binary
                .clone()
                .filter(|b| !b.is_empty())
                .ok_or_else(|| SandboxError::MissingWasmBinary(tool.name.clone()))?;
            Ok(ExecPlan::Wasm {
                binary_path: config.wasm_dir.join(binary),
                args: argv.to_vec(),
                env: kept_env,
                root_dir: config.root_dir.clone(),
                wasm_dir: config.wasm_dir.clone(),
                cwd: resolved_cwd,
                stderr_tag: tool.name.clone(),
            })
        }
        SandboxMode::Auto => unreachable!("resolve_mode never returns Auto"),
    }
}

/// Runs a `ExecPlan::Wasm` plan to completion via the embedded WASI host.
pub fn run_wasm(plan: &ExecPlan) -> Result<WasmOutcome, SandboxError> {
    match plan {
        ExecPlan::Wasm {
            binary_path,
            args,
            env,
            root_dir,
            wasm_dir,
            cwd,
            ..
        } => wasm::run(binary_path, args, env, root_dir, wasm_dir, cwd),
        ExecPlan::Process { .. } => Err(SandboxError::WasmExec(
            "run_wasm called on a non-wasm ExecPlan".to_string(),
        )),
    }
}

fn resolve_mode(mode: SandboxMode) -> SandboxMode {
    match mode {
        SandboxMode::Auto => {
            if bubblewrap::bwrap_available() {
                SandboxMode::Bubblewrap
            } else {
                SandboxMode::None
            }
        }
        other => other,
    }
}
