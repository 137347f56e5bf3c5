//! Tool-execution MCP gateway: policy evaluation, sandboxed execution, and
//! response framing over stdio or classic HTTP JSON-RPC (spec §4.11).

pub mod dispatch;
pub mod exec;
pub mod http;
pub mod registry;
pub mod stdio;
pub mod tools;

pub use dispatch::{handle_request, GatewayState};
pub use exec::{execute, ExecError, ExecOutcome, MAX_CAPTURE_BYTES};
pub use registry::ToolRegistry;
