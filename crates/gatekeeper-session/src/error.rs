use gatekeeper_rpc::RpcError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to start upstream client: {0}")]
    ClientStart(#[source] RpcError),
    #[error("upstream initialize failed: {0}")]
    Initialize(#[source] RpcError),
    #[error("unknown session")]
    NotFound,
    #[error("session expired")]
    Expired,
}
