//! Server-Sent Events event record for the Streamable-HTTP `GET /mcp`
//! stream (spec §4.10/§6), grounded on
//! `turbomcp-transport-streamable::sse`'s `SseEvent` shape. The actual
//! wire framing (event/id/data lines, heartbeat comments) is done by
//! `axum::response::sse` in `gatekeeper-bridge::mcp` - this type only
//! carries the replay-buffered payload between a session and that
//! handler.

#[derive(Debug, Clone)]
pub struct SseEvent {
    pub id: Option<u64>,
    pub event: Option<String>,
    pub data: String,
}

impl SseEvent {
    pub fn message(data: impl Into<String>) -> Self {
        SseEvent {
            id: None,
            event: Some("message".to_string()),
            data: data.into(),
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }
}
