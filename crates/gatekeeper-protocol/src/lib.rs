//! Wire types shared across the gatekeeper workspace: JSON-RPC 2.0
//! envelopes, MCP content blocks, and the tool descriptor.

pub mod content;
pub mod error;
pub mod jsonrpc;
pub mod metrics;
pub mod tool;

pub const MCP_PROTOCOL_VERSION: &str = "2025-06-18";

pub use content::{ContentBlock, EmbeddedResource, ToolCallResult};
pub use error::GatewayError;
pub use jsonrpc::{
    InboundMessage, JsonRpcError, JsonRpcErrorCode, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, JsonRpcResponsePayload, RequestId, ResponseId, JSONRPC_VERSION,
};
pub use metrics::GatewayMetrics;
pub use tool::{PluginFile, SandboxMode, ToolDescriptor, ToolValidationError, DEFAULT_TIMEOUT_MS};
