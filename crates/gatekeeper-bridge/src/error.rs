//! HTTP-level failures for the bridge surface (spec §4.10, §7). These are
//! the ones that short-circuit before a JSON-RPC envelope exists at all -
//! everything past header/session validation rides in a 200 body instead
//! (see `mcp::forward_and_respond`).

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use gatekeeper_session::SessionError;
use serde_json::json;

#[derive(Debug)]
pub enum BridgeError {
    BadRequest(String),
    UnknownSession,
    NotFound,
    Unauthorized(Option<String>),
    RateLimited,
    InvalidBody(String),
    SessionCreate(SessionError),
    Internal(String),
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        match self {
            BridgeError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            BridgeError::UnknownSession => (StatusCode::NOT_FOUND, "unknown session").into_response(),
            BridgeError::NotFound => (StatusCode::NOT_FOUND, "not found").into_response(),
            BridgeError::Unauthorized(www_authenticate) => {
                let mut response = (StatusCode::UNAUTHORIZED, "unauthorized").into_response();
                if let Some(value) = www_authenticate.and_then(|v| HeaderValue::from_str(&v).ok()) {
                    response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
                }
                response
            }
            BridgeError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate limited").into_response(),
            BridgeError::InvalidBody(msg) => (
                StatusCode::OK,
                Json(json!({
                    "jsonrpc": "2.0",
                    "id": serde_json::Value::Null,
                    "error": { "code": -32700, "message": format!("Parse error: {msg}") },
                })),
            )
                .into_response(),
            BridgeError::SessionCreate(e) => (
                StatusCode::OK,
                Json(json!({
                    "jsonrpc": "2.0",
                    "id": serde_json::Value::Null,
                    "error": { "code": -32603, "message": format!("Forward error: {e}") },
                })),
            )
                .into_response(),
            BridgeError::Internal(msg) => (
                StatusCode::OK,
                Json(json!({
                    "jsonrpc": "2.0",
                    "id": serde_json::Value::Null,
                    "error": { "code": -32603, "message": msg },
                })),
            )
                .into_response(),
        }
    }
}
