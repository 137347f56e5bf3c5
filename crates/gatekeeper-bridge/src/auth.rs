//! Bearer authentication for the bridge surface: either a plain API key
//! or an OAuth access token, both carried as `Authorization: Bearer
//! <token>` (spec §6). Auth is skipped entirely when the deployment
//! configured neither an API-key store nor OAuth.

use crate::error::BridgeError;
use crate::state::BridgeState;
use axum::http::{header, HeaderMap};
use gatekeeper_auth::{extract_bearer, www_authenticate, ApiKeyRecord};

pub async fn authenticate(state: &BridgeState, headers: &HeaderMap) -> Result<Option<ApiKeyRecord>, BridgeError> {
    if state.api_keys.is_none() && state.oauth.is_none() {
        return Ok(None);
    }

    let unauthorized = |error: &str| {
        let metadata = state
            .oauth
            .is_some()
            .then(|| www_authenticate("/.well-known/oauth-protected-resource", Some(error)));
        BridgeError::Unauthorized(metadata)
    };

    let raw = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| unauthorized("invalid_token"))?;
    let token = extract_bearer(raw).map_err(|_| unauthorized("invalid_token"))?;

    if let Some(oauth) = &state.oauth {
        if let Some(client_id) = oauth.validate_access_token(token).await {
            return Ok(Some(ApiKeyRecord {
                key_id: client_id,
                label: "oauth".to_string(),
                visible_tools: None,
            }));
        }
    }
    if let Some(keys) = &state.api_keys {
        if let Some(record) = keys.lookup(token).await {
            return Ok(Some(record));
        }
    }
    Err(unauthorized("invalid_token"))
}
