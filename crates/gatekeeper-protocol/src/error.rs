//! The error taxonomy shared across crates (spec §7): configuration errors
//! are fatal at startup, everything else maps to a JSON-RPC error code or
//! an HTTP status at the edges. This crate only defines the codes and the
//! root `GatewayError` enum; subsystem crates define their own error types
//! and convert into this one at their boundary.

use crate::jsonrpc::{JsonRpcError, JsonRpcErrorCode};
use thiserror::Error;

/// Gateway-specific JSON-RPC error codes beyond the JSON-RPC 2.0 standard
/// ones already in `JsonRpcErrorCode`. Kept separate so the standard codes
/// remain a closed, spec-literal set.
pub const ERR_RESPONSE_TOO_LARGE_MESSAGE: &str = "Response too large";
pub const ERR_FORWARD_MESSAGE: &str = "Forward error";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("unknown method: {0}")]
    MethodNotFound(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("rate limited")]
    RateLimited,

    #[error("sandbox/exec error: {0}")]
    Sandbox(String),

    #[error("upstream forward error: {0}")]
    Upstream(String),

    #[error("response too large")]
    ResponseTooLarge,

    #[error("session error: {0}")]
    Session(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl GatewayError {
    /// Maps this error to the JSON-RPC error object it should ride in,
    /// for errors that are *not* surfaced as a tool-result `isError` block
    /// or an HTTP status code.
    pub fn to_jsonrpc_error(&self) -> JsonRpcError {
        match self {
            GatewayError::Parse(msg) => {
                JsonRpcError::new(JsonRpcErrorCode::ParseError.code(), msg.clone())
            }
            GatewayError::MethodNotFound(method) => JsonRpcError::new(
                JsonRpcErrorCode::MethodNotFound.code(),
                format!("Method not found: {method}"),
            ),
            GatewayError::InvalidParams(msg) => {
                JsonRpcError::new(JsonRpcErrorCode::InvalidParams.code(), msg.clone())
            }
            GatewayError::Sandbox(msg) => {
                JsonRpcError::new(JsonRpcErrorCode::InternalError.code(), msg.clone())
            }
            GatewayError::Upstream(msg) => JsonRpcError::new(
                JsonRpcErrorCode::InternalError.code(),
                format!("{ERR_FORWARD_MESSAGE}: {msg}"),
            ),
            GatewayError::ResponseTooLarge => JsonRpcError::new(
                JsonRpcErrorCode::InternalError.code(),
                ERR_RESPONSE_TOO_LARGE_MESSAGE,
            ),
            other => JsonRpcError::new(JsonRpcErrorCode::InternalError.code(), other.to_string()),
        }
    }

    /// HTTP status code for errors that short-circuit before a JSON-RPC
    /// body is produced at all (auth, rate limit, session lookup).
    pub fn http_status(&self) -> Option<u16> {
        match self {
            GatewayError::Unauthorized(_) => Some(401),
            GatewayError::RateLimited => Some(429),
            GatewayError::Session(_) => Some(404),
            GatewayError::InvalidParams(_) => Some(400),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_too_large_maps_to_internal_error_code() {
        let err = GatewayError::ResponseTooLarge;
        let rpc = err.to_jsonrpc_error();
        assert_eq!(rpc.code, JsonRpcErrorCode::InternalError.code());
        assert_eq!(rpc.message, ERR_RESPONSE_TOO_LARGE_MESSAGE);
    }

    #[test]
    fn rate_limited_maps_to_429_not_an_rpc_code() {
        let err = GatewayError::RateLimited;
        assert_eq!(err.http_status(), Some(429));
    }
}
