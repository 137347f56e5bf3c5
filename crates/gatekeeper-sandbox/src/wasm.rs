//! WASI preview-1 host for the `wasm` sandbox mode (spec §4.4), adapted
//! from the WasiCtxBuilder + preopened-directories + captured-stdio
//! pattern in `other_examples/9239224e_nearai-ironclaw__src-tools-wasm-wrapper.rs.rs`,
//! simplified from that file's component-model bindgen down to a plain
//! preview-1 command module since the gateway only needs argv/env/FS, not
//! a WIT interface.

use crate::error::SandboxError;
use std::path::Path;
use wasmtime::{Config, Engine, Linker, Module, Store};
use wasmtime_wasi::preview1::{self, WasiP1Ctx};
use wasmtime_wasi::pipe::MemoryOutputPipe;
use wasmtime_wasi::{DirPerms, FilePerms, WasiCtxBuilder};

const CAPTURE_BUFFER_BYTES: usize = 1024 * 1024;

pub struct WasmOutcome {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
}

/// Runs `<wasm_dir>/<binary_path>` as a WASI preview-1 command module.
/// `/` maps to `root_dir`, `/.wasm` maps to `wasm_dir`, and `cwd` is
/// preopened under its own host path so guest-relative paths resolve the
/// same way they would under bubblewrap.
pub fn run(
    binary_path: &Path,
    args: &[String],
    env: &[(String, String)],
    root_dir: &Path,
    wasm_dir: &Path,
    cwd: &Path,
) -> Result<WasmOutcome, SandboxError> {
    let config = Config::new();
    let engine = Engine::new(&config).map_err(|e| SandboxError::WasmExec(e.to_string()))?;

    let module = Module::from_file(&engine, binary_path)
        .map_err(|e| SandboxError::WasmLoad(binary_path.display().to_string(), e.to_string()))?;

    let mut linker: Linker<WasiP1Ctx> = Linker::new(&engine);
    preview1::add_to_linker_sync(&mut linker, |ctx: &mut WasiP1Ctx| ctx)
        .map_err(|e| SandboxError::WasmExec(e.to_string()))?;

    let stdout_pipe = MemoryOutputPipe::new(CAPTURE_BUFFER_BYTES);
    let stderr_pipe = MemoryOutputPipe::new(CAPTURE_BUFFER_BYTES);

    let mut builder = WasiCtxBuilder::new();
    builder.stdout(stdout_pipe.clone());
    builder.stderr(stderr_pipe.clone());

    let mut argv0_plus_args = vec![binary_path.display().to_string()];
    argv0_plus_args.extend(args.iter().cloned());
    builder.args(&argv0_plus_args);

    for (key, value) in env {
        builder.env(key, value);
    }

    builder
        .preopened_dir(root_dir, "/", DirPerms::all(), FilePerms::all())
        .map_err(|e| SandboxError::WasmExec(e.to_string()))?;
    builder
        .preopened_dir(wasm_dir, "/.wasm", DirPerms::READ, FilePerms::READ)
        .map_err(|e| SandboxError::WasmExec(e.to_string()))?;
    builder
        .preopened_dir(
            cwd,
            cwd.display().to_string(),
            DirPerms::all(),
            FilePerms::all(),
        )
        .map_err(|e| SandboxError::WasmExec(e.to_string()))?;

    let wasi_ctx = builder.build_p1();
    let mut store = Store::new(&engine, wasi_ctx);

    let instance = linker
        .instantiate(&mut store, &module)
        .map_err(|e| SandboxError::WasmExec(e.to_string()))?;
    let start = instance
        .get_typed_func::<(), ()>(&mut store, "_start")
        .map_err(|e| SandboxError::WasmExec(e.to_string()))?;

    let exit_code = match start.call(&mut store, ()) {
        Ok(()) => 0,
        Err(trap) => match trap.downcast_ref::<wasmtime_wasi::I32Exit>() {
            Some(exit) => exit.0,
            None => return Err(SandboxError::WasmExec(trap.to_string())),
        },
    };

    Ok(WasmOutcome {
        stdout: stdout_pipe.contents().to_vec(),
        stderr: stderr_pipe.contents().to_vec(),
        exit_code,
    })
}
