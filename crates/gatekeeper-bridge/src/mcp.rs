//! `POST`/`GET`/`DELETE /mcp`: the Streamable-HTTP session lifecycle
//! (routing table below) plus the classic HTTP JSON-RPC fallback that
//! skips the `Mcp-Session-Id` dance entirely.
//!
//! ```text
//! POST /mcp, no Mcp-Session-Id, method=initialize -> 200, new session, Mcp-Session-Id set
//! POST /mcp, Mcp-Session-Id, any other method     -> 200/202, forwarded to that session
//! POST /mcp, missing/unknown Mcp-Session-Id        -> 400/404
//! GET  /mcp, Mcp-Session-Id, Accept: text/event-stream -> SSE stream
//! DELETE /mcp, Mcp-Session-Id                      -> 204, session closed
//! ```

use crate::auth;
use crate::error::BridgeError;
use crate::headers::{self, SESSION_ID_HEADER};
use crate::state::BridgeState;
use async_stream::stream;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use futures::FutureExt;
use gatekeeper_auth::ApiKeyRecord;
use gatekeeper_protocol::content::ToolCallResult;
use gatekeeper_protocol::error::GatewayError;
use gatekeeper_protocol::jsonrpc::JsonRpcError;
use gatekeeper_rpc::RpcError;
use gatekeeper_session::Session;
use gatekeeper_store::externalize;
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

#[derive(Debug, Deserialize)]
struct RequestProbe {
    id: Option<Value>,
    method: Option<String>,
}

pub async fn post_mcp(
    State(state): State<Arc<BridgeState>>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Response, BridgeError> {
    headers::validate_protocol_version(&headers, &state.protocol_version)?;
    let api_key = auth::authenticate(&state, &headers).await?;
    rate_limit(&state, api_key.as_ref())?;
    let session_id = headers::session_id(&headers)?;

    // A panic anywhere past this point is caught at this single seam and
    // turned into a `-32603` reply rather than taking the connection down
    // with it (spec §7, §9 "a panic in a request handler must be converted
    // to a -32603 reply before the connection is released").
    match AssertUnwindSafe(route_request(state, session_id, body))
        .catch_unwind()
        .await
    {
        Ok(result) => result,
        Err(_panic) => Err(BridgeError::Internal("internal error".to_string())),
    }
}

async fn route_request(
    state: Arc<BridgeState>,
    session_id: Option<gatekeeper_session::SessionId>,
    body: axum::body::Bytes,
) -> Result<Response, BridgeError> {
    let probe: RequestProbe =
        serde_json::from_slice(&body).map_err(|e| BridgeError::InvalidBody(e.to_string()))?;

    if !state.require_sessions {
        return Ok(handle_classic(&state, probe, &body).await);
    }

    if probe.method.as_deref() == Some("initialize") {
        if session_id.is_some() {
            return Err(BridgeError::BadRequest(
                "initialize must not carry Mcp-Session-Id".to_string(),
            ));
        }
        return handle_initialize(&state, &probe).await;
    }

    let Some(session_id) = session_id else {
        return Err(BridgeError::BadRequest(
            "missing Mcp-Session-Id".to_string(),
        ));
    };
    let session = state.sessions.get(session_id).ok_or(BridgeError::UnknownSession)?;
    state.sessions.touch(session_id);
    Ok(forward_and_respond(&state, &session, &probe, &body).await)
}

/// One request, one ephemeral session: `initialize` is answered directly,
/// anything else spins a session up, forwards once, and tears it down -
/// no `Mcp-Session-Id` ever leaves the building (spec §6 classic mode).
async fn handle_classic(state: &Arc<BridgeState>, probe: RequestProbe, body: &[u8]) -> Response {
    if probe.method.as_deref() == Some("initialize") {
        return match handle_initialize(state, &probe).await {
            Ok(response) => response,
            Err(e) => e.into_response(),
        };
    }

    let session = match state.sessions.create().await {
        Ok(session) => session,
        Err(e) => return BridgeError::SessionCreate(e).into_response(),
    };
    let response = forward_and_respond(state, &session, &probe, body).await;
    state.sessions.delete(session.id).await;
    response
}

async fn handle_initialize(state: &Arc<BridgeState>, probe: &RequestProbe) -> Result<Response, BridgeError> {
    let session = state
        .sessions
        .create()
        .await
        .map_err(BridgeError::SessionCreate)?;

    let mut capabilities = json!({});
    if state.oauth.is_some() {
        capabilities["experimental"] = json!({ "io.modelcontextprotocol/oauth-client-credentials": {} });
    }
    let result = json!({
        "protocolVersion": state.protocol_version,
        "capabilities": capabilities,
        "serverInfo": { "name": state.server_name, "version": state.server_version },
    });

    let id = probe.id.clone().unwrap_or(Value::Null);
    let mut response = Json(json!({ "jsonrpc": "2.0", "id": id, "result": result })).into_response();
    if let Ok(header_value) = HeaderValue::from_str(&session.id.to_string()) {
        response.headers_mut().insert(SESSION_ID_HEADER, header_value);
    }
    Ok(response)
}

async fn forward_and_respond(
    state: &Arc<BridgeState>,
    session: &Session,
    probe: &RequestProbe,
    body: &[u8],
) -> Response {
    match session.client.forward(body).await {
        Ok(None) => StatusCode::ACCEPTED.into_response(),
        Ok(Some(value)) => match externalize_forwarded(state, value).await {
            Ok(value) => {
                let id = probe.id.clone().unwrap_or(Value::Null);
                Json(json!({ "jsonrpc": "2.0", "id": id, "result": value })).into_response()
            }
            Err(_) => jsonrpc_error_response(probe, GatewayError::ResponseTooLarge.to_jsonrpc_error()),
        },
        Err(RpcError::Remote(remote_error)) => jsonrpc_error_response(probe, remote_error),
        Err(e) => jsonrpc_error_response(probe, GatewayError::Upstream(e.to_string()).to_jsonrpc_error()),
    }
}

fn jsonrpc_error_response(probe: &RequestProbe, error: JsonRpcError) -> Response {
    let id = probe.id.clone().unwrap_or(Value::Null);
    Json(json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": error.code, "message": error.message, "data": error.data },
    }))
    .into_response()
}

/// Runs the full content-rewrite pipeline for `tools/call`-shaped results;
/// for anything else, just enforces the serialized byte ceiling since the
/// externalizer only knows how to walk `ToolCallResult.content`.
async fn externalize_forwarded(
    state: &Arc<BridgeState>,
    value: Value,
) -> Result<Value, gatekeeper_store::StoreError> {
    match serde_json::from_value::<ToolCallResult>(value.clone()) {
        Ok(result) => {
            let rewritten = externalize(&state.store, &state.externalizer_config, result).await?;
            Ok(serde_json::to_value(rewritten)?)
        }
        Err(_) => {
            if serde_json::to_vec(&value)?.len() > state.externalizer_config.max_bytes {
                Err(gatekeeper_store::StoreError::ResponseTooLarge)
            } else {
                Ok(value)
            }
        }
    }
}

/// One limiter process-wide for the bridge (spec §4.8) - every caller
/// shares the same budget under the fixed key `"_bridge"` regardless of
/// which API key or OAuth client made the request, unlike the gateway's
/// per-API-key limiter.
fn rate_limit(state: &BridgeState, _api_key: Option<&ApiKeyRecord>) -> Result<(), BridgeError> {
    if state.rate_limiter.allow("_bridge") {
        Ok(())
    } else {
        Err(BridgeError::RateLimited)
    }
}

pub async fn get_mcp(
    State(state): State<Arc<BridgeState>>,
    headers: HeaderMap,
) -> Result<Response, BridgeError> {
    headers::validate_protocol_version(&headers, &state.protocol_version)?;
    auth::authenticate(&state, &headers).await?;

    if !headers::accepts_event_stream(&headers) {
        return Err(BridgeError::BadRequest(
            "GET /mcp requires Accept: text/event-stream".to_string(),
        ));
    }
    let Some(session_id) = headers::session_id(&headers)? else {
        return Err(BridgeError::BadRequest("missing Mcp-Session-Id".to_string()));
    };
    let session = state.sessions.get(session_id).ok_or(BridgeError::UnknownSession)?;
    state.sessions.touch(session_id);

    let replay = headers::last_event_id(&headers)
        .map(|last| session.replay_from(last))
        .unwrap_or_default();
    let mut receiver = session.subscribe();

    let event_stream = stream! {
        for event in replay {
            yield Ok::<Event, Infallible>(sse_event(event));
        }
        loop {
            match receiver.recv().await {
                Ok(event) => yield Ok(sse_event(event)),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    };

    Ok(Sse::new(event_stream)
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(30)).text("heartbeat"))
        .into_response())
}

fn sse_event(event: gatekeeper_session::SseEvent) -> Event {
    let mut built = Event::default().data(event.data);
    if let Some(kind) = event.event {
        built = built.event(kind);
    }
    if let Some(id) = event.id {
        built = built.id(id.to_string());
    }
    built
}

pub async fn delete_mcp(
    State(state): State<Arc<BridgeState>>,
    headers: HeaderMap,
) -> Result<StatusCode, BridgeError> {
    let Some(session_id) = headers::session_id(&headers)? else {
        return Err(BridgeError::BadRequest("missing Mcp-Session-Id".to_string()));
    };
    if state.sessions.delete(session_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(BridgeError::UnknownSession)
    }
}
