//! Runs an `ExecPlan` to completion, bounding captured output and
//! enforcing `tool.timeout_ms` (spec §4.11 step 6).

use gatekeeper_sandbox::{run_wasm, ExecPlan, SandboxError};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::timeout;

pub const MAX_CAPTURE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ExecOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub timed_out: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("failed to spawn tool process: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("sandbox error: {0}")]
    Sandbox(#[from] SandboxError),
}

/// Executes `plan`, capturing stdout/stderr up to `MAX_CAPTURE_BYTES` each
/// and killing the child if `timeout` elapses first.
pub async fn execute(plan: &ExecPlan, timeout_duration: Duration) -> Result<ExecOutcome, ExecError> {
    match plan {
        ExecPlan::Process {
            command,
            args,
            env,
            cwd,
            ..
        } => execute_process(command, args, env, cwd, timeout_duration).await,
        ExecPlan::Wasm { .. } => execute_wasm(plan, timeout_duration).await,
    }
}

async fn execute_process(
    command: &str,
    args: &[String],
    env: &[(String, String)],
    cwd: &std::path::Path,
    timeout_duration: Duration,
) -> Result<ExecOutcome, ExecError> {
    let mut cmd = Command::new(command);
    cmd.args(args)
        .current_dir(cwd)
        .env_clear()
        .envs(env.iter().cloned())
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(ExecError::Spawn)?;
    let mut stdout_pipe = child.stdout.take().expect("piped stdout");
    let mut stderr_pipe = child.stderr.take().expect("piped stderr");

    let drain = async {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        tokio::join!(
            read_bounded(&mut stdout_pipe, &mut stdout),
            read_bounded(&mut stderr_pipe, &mut stderr),
        );
        let status = child.wait().await;
        (stdout, stderr, status)
    };

    match timeout(timeout_duration, drain).await {
        Ok((stdout, stderr, status)) => {
            let exit_code = status.ok().and_then(|s| s.code()).unwrap_or(-1);
            Ok(ExecOutcome {
                stdout: String::from_utf8_lossy(&stdout).into_owned(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
                exit_code,
                timed_out: false,
            })
        }
        Err(_elapsed) => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            Ok(ExecOutcome {
                stdout: String::new(),
                stderr: "tool execution timed out".to_string(),
                exit_code: -1,
                timed_out: true,
            })
        }
    }
}

async fn read_bounded(reader: &mut (impl tokio::io::AsyncRead + Unpin), out: &mut Vec<u8>) {
    let mut buf = [0u8; 8192];
    loop {
        if out.len() >= MAX_CAPTURE_BYTES {
            break;
        }
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let remaining = MAX_CAPTURE_BYTES - out.len();
                out.extend_from_slice(&buf[..n.min(remaining)]);
            }
        }
    }
}

/// Wasmtime's synchronous engine has no external "kill" primitive the way
/// a process does; `timeout` here bounds how long the gateway waits for
/// the blocking task, but a runaway guest module keeps running on its
/// worker thread until it returns on its own (acceptable - a malicious
/// wasm binary having to be reachable at all already implies it passed
/// policy evaluation and is hosted in the `wasm_dir` the operator chose).
async fn execute_wasm(plan: &ExecPlan, timeout_duration: Duration) -> Result<ExecOutcome, ExecError> {
    let plan = plan.clone();
    let handle = tokio::task::spawn_blocking(move || run_wasm(&plan));
    match timeout(timeout_duration, handle).await {
        Ok(Ok(Ok(outcome))) => Ok(ExecOutcome {
            stdout: String::from_utf8_lossy(&outcome.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&outcome.stderr).into_owned(),
            exit_code: outcome.exit_code,
            timed_out: false,
        }),
        Ok(Ok(Err(e))) => Err(ExecError::Sandbox(e)),
        Ok(Err(_join_error)) => Err(ExecError::Sandbox(SandboxError::WasmExec(
            "wasm task panicked".to_string(),
        ))),
        Err(_elapsed) => Ok(ExecOutcome {
            stdout: String::new(),
            stderr: "tool execution timed out".to_string(),
            exit_code: -1,
            timed_out: true,
        }),
    }
}
