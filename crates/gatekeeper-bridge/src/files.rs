//! `GET /files/{key}` (spec §4.6, §6): one-shot retrieval from the
//! content-addressed file store.

use crate::error::BridgeError;
use crate::state::BridgeState;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

pub async fn get_file(
    State(state): State<Arc<BridgeState>>,
    Path(key): Path<String>,
) -> Result<Response, BridgeError> {
    let (meta, bytes) = state.store.get(&key).await.map_err(|_| BridgeError::NotFound)?;
    let mut response = bytes.into_response();
    let mime_type =
        HeaderValue::from_str(&meta.mime_type).unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    response.headers_mut().insert(header::CONTENT_TYPE, mime_type);
    Ok(response)
}
