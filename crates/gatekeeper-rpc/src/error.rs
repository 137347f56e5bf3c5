use gatekeeper_protocol::jsonrpc::JsonRpcError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("child process already started")]
    AlreadyStarted,
    #[error("failed to spawn child process: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("write to child stdin failed: {0}")]
    Write(#[source] std::io::Error),
    #[error("client is closed")]
    ClientClosed,
    #[error("call timed out")]
    Timeout,
    #[error("call cancelled")]
    Cancelled,
    #[error("malformed message: {0}")]
    InvalidMessage(String),
    #[error("remote returned an error: {0:?}")]
    Remote(JsonRpcError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
