//! `GET /health` (spec §6).

use crate::state::BridgeState;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

pub async fn get_health(State(state): State<Arc<BridgeState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "initialized": true,
        "sessions": state.sessions.len(),
    }))
}
