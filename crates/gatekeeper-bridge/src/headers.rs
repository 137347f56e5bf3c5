//! Streamable-HTTP header validation (spec §4.10): `Mcp-Session-Id`,
//! `MCP-Protocol-Version`, `Accept`, and `Last-Event-ID`.

use crate::error::BridgeError;
use axum::http::{header, HeaderMap};
use gatekeeper_session::SessionId;
use std::str::FromStr;

pub const SESSION_ID_HEADER: &str = "mcp-session-id";
pub const PROTOCOL_VERSION_HEADER: &str = "mcp-protocol-version";
pub const LAST_EVENT_ID_HEADER: &str = "last-event-id";

/// If the header is present it must equal `expected`; its absence is not
/// an error (the client may simply not be pinning a version yet).
pub fn validate_protocol_version(headers: &HeaderMap, expected: &str) -> Result<(), BridgeError> {
    match headers.get(PROTOCOL_VERSION_HEADER).and_then(|v| v.to_str().ok()) {
        Some(version) if version == expected => Ok(()),
        Some(other) => Err(BridgeError::BadRequest(format!(
            "unsupported MCP-Protocol-Version: {other}"
        ))),
        None => Ok(()),
    }
}

/// `Ok(None)` means the header was absent; a present-but-malformed value
/// is a 400, same as a missing one would be once the caller requires it.
pub fn session_id(headers: &HeaderMap) -> Result<Option<SessionId>, BridgeError> {
    match headers.get(SESSION_ID_HEADER).and_then(|v| v.to_str().ok()) {
        Some(raw) => SessionId::from_str(raw)
            .map(Some)
            .map_err(|_| BridgeError::BadRequest(format!("malformed Mcp-Session-Id: {raw}"))),
        None => Ok(None),
    }
}

pub fn last_event_id(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(LAST_EVENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
}

pub fn accepts_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("text/event-stream") || v.contains("*/*"))
}
