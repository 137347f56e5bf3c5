use thiserror::Error;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("cwd `{cwd}` escapes root_dir `{root}`")]
    PathEscape { cwd: String, root: String },

    #[error("cwd `{0}` could not be resolved")]
    InvalidCwd(String),

    #[error("bwrap binary not found on PATH")]
    BwrapNotFound,

    #[error("wasm_binary not configured for tool `{0}`")]
    MissingWasmBinary(String),

    #[error("wasm module `{0}` failed to load: {1}")]
    WasmLoad(String, String),

    #[error("wasm execution failed: {0}")]
    WasmExec(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
