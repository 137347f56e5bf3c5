//! JSON-RPC 2.0 envelope types.
//!
//! Request IDs are kept loose on purpose: `RequestId` models the three shapes
//! the wire actually allows (number, string, null) without collapsing them,
//! because `1`, `"1"`, and `1.0` must stay distinguishable for callers that
//! correlate on the raw bytes (see `gatekeeper-rpc`'s pending table).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const JSONRPC_VERSION: &str = "2.0";

/// A JSON-RPC request/response identifier.
///
/// `serde(untagged)` preserves whichever shape was on the wire instead of
/// normalizing numbers and strings together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{n}"),
            RequestId::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(value: i64) -> Self {
        RequestId::Number(value)
    }
}

impl From<String> for RequestId {
    fn from(value: String) -> Self {
        RequestId::String(value)
    }
}

/// Wraps an optional `RequestId` so error responses with a `null` id
/// (parse errors, where no id could be recovered) round-trip correctly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseId(pub Option<RequestId>);

impl ResponseId {
    pub fn from_request(id: RequestId) -> Self {
        ResponseId(Some(id))
    }

    pub fn null() -> Self {
        ResponseId(None)
    }

    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    pub fn as_request_id(&self) -> Option<&RequestId> {
        self.0.as_ref()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    pub id: RequestId,
}

impl JsonRpcRequest {
    pub fn new(id: RequestId, method: impl Into<String>, params: Option<Value>) -> Self {
        JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        JsonRpcNotification {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        JsonRpcError {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Standard and MCP-specific JSON-RPC error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
}

impl JsonRpcErrorCode {
    pub const fn code(self) -> i64 {
        match self {
            JsonRpcErrorCode::ParseError => -32700,
            JsonRpcErrorCode::InvalidRequest => -32600,
            JsonRpcErrorCode::MethodNotFound => -32601,
            JsonRpcErrorCode::InvalidParams => -32602,
            JsonRpcErrorCode::InternalError => -32603,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcResponsePayload {
    Success { result: Value },
    Error { error: JsonRpcError },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(flatten)]
    pub payload: JsonRpcResponsePayload,
    pub id: ResponseId,
}

impl JsonRpcResponse {
    pub fn success(id: RequestId, result: Value) -> Self {
        JsonRpcResponse {
            jsonrpc: JSONRPC_VERSION.to_string(),
            payload: JsonRpcResponsePayload::Success { result },
            id: ResponseId::from_request(id),
        }
    }

    pub fn error(id: ResponseId, error: JsonRpcError) -> Self {
        JsonRpcResponse {
            jsonrpc: JSONRPC_VERSION.to_string(),
            payload: JsonRpcResponsePayload::Error { error },
            id,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.payload, JsonRpcResponsePayload::Error { .. })
    }
}

/// An inbound line from the child: either a request/notification (has
/// `method`) or a response (has `result`/`error`). Distinguishing these is
/// the first thing the reader task in `gatekeeper-rpc` must do, since a
/// non-null `id` does not by itself mean "this is a response" - the child
/// can originate its own requests (e.g. `roots/list`).
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
    #[serde(default)]
    pub id: Option<Value>,
}

impl InboundMessage {
    /// A message carrying `method` is a request (if `id` is present) or a
    /// notification (if not), regardless of whether `id` is also present.
    pub fn is_request_or_notification(&self) -> bool {
        self.method.is_some()
    }

    pub fn is_response(&self) -> bool {
        self.method.is_none() && (self.result.is_some() || self.error.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_id_preserves_number_vs_string() {
        let numeric: RequestId = serde_json::from_str("1").unwrap();
        let stringy: RequestId = serde_json::from_str("\"1\"").unwrap();
        assert_eq!(numeric, RequestId::Number(1));
        assert_eq!(stringy, RequestId::String("1".to_string()));
        assert_ne!(numeric, stringy);
    }

    #[test]
    fn response_id_null_round_trips() {
        let id = ResponseId::null();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "null");
        let back: ResponseId = serde_json::from_str(&json).unwrap();
        assert!(back.is_null());
    }

    #[test]
    fn response_payload_untagged_dispatches_on_shape() {
        let ok = JsonRpcResponse::success(RequestId::Number(1), serde_json::json!({"ok": true}));
        let ok_json = serde_json::to_value(&ok).unwrap();
        assert_eq!(ok_json["result"]["ok"], serde_json::json!(true));

        let err = JsonRpcResponse::error(
            ResponseId::from_request(RequestId::Number(2)),
            JsonRpcError::new(JsonRpcErrorCode::MethodNotFound.code(), "Method not found"),
        );
        let err_json = serde_json::to_value(&err).unwrap();
        assert_eq!(err_json["error"]["code"], serde_json::json!(-32601));
    }

    #[test]
    fn inbound_message_classifies_request_vs_notification_vs_response() {
        let req: InboundMessage =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"roots/list","id":1}"#).unwrap();
        assert!(req.is_request_or_notification());
        assert!(!req.is_response());

        let notif: InboundMessage =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
                .unwrap();
        assert!(notif.is_request_or_notification());

        let resp: InboundMessage =
            serde_json::from_str(r#"{"jsonrpc":"2.0","result":{"ok":true},"id":1}"#).unwrap();
        assert!(resp.is_response());
        assert!(!resp.is_request_or_notification());
    }
}
