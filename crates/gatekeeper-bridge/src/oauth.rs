//! `POST /oauth/token` and the `.well-known` discovery documents (spec
//! §6), mounted only when the deployment enables OAuth.

use crate::state::BridgeState;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use gatekeeper_auth::{extract_bearer, AuthError};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    grant_type: String,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    client_secret: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

/// Accepts form-encoded client credentials, falling back to HTTP Basic
/// auth for `client_id`/`client_secret` per RFC 6749 §2.3.1.
pub async fn post_token(
    State(state): State<Arc<BridgeState>>,
    headers: axum::http::HeaderMap,
    axum::Form(request): axum::Form<TokenRequest>,
) -> Response {
    let Some(issuer) = &state.oauth else {
        return oauth_error(StatusCode::NOT_FOUND, "invalid_request", "OAuth is not enabled");
    };

    let basic_auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(decode_basic_auth);

    let result = match request.grant_type.as_str() {
        "client_credentials" => {
            let (client_id, client_secret) = match (&request.client_id, &request.client_secret, &basic_auth) {
                (Some(id), Some(secret), _) => (id.clone(), secret.clone()),
                (_, _, Some((id, secret))) => (id.clone(), secret.clone()),
                _ => {
                    return oauth_error(
                        StatusCode::BAD_REQUEST,
                        "invalid_request",
                        "missing client_id/client_secret",
                    )
                }
            };
            issuer
                .client_credentials(&client_id, &client_secret, request.scope.clone())
                .await
        }
        "refresh_token" => {
            let Some(refresh_token) = &request.refresh_token else {
                return oauth_error(StatusCode::BAD_REQUEST, "invalid_request", "missing refresh_token");
            };
            issuer.refresh_token(refresh_token).await
        }
        other => {
            return oauth_error(
                StatusCode::BAD_REQUEST,
                "unsupported_grant_type",
                &format!("unsupported grant_type `{other}`"),
            )
        }
    };

    match result {
        Ok(token) => Json(token).into_response(),
        Err(e) => oauth_error(status_for(&e), e.oauth_code(), &e.to_string()),
    }
}

fn status_for(error: &AuthError) -> StatusCode {
    match error {
        AuthError::InvalidClient | AuthError::InvalidGrant => StatusCode::UNAUTHORIZED,
        _ => StatusCode::BAD_REQUEST,
    }
}

fn oauth_error(status: StatusCode, code: &str, description: &str) -> Response {
    (
        status,
        Json(json!({ "error": code, "error_description": description })),
    )
        .into_response()
}

fn decode_basic_auth(header_value: &str) -> Option<(String, String)> {
    let token = extract_bearer(&header_value.replacen("Basic", "Bearer", 1)).ok()?;
    use base64::Engine;
    let decoded = base64::engine::general_purpose::STANDARD.decode(token).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (id, secret) = text.split_once(':')?;
    Some((id.to_string(), secret.to_string()))
}

pub async fn get_protected_resource_metadata(
    State(state): State<Arc<BridgeState>>,
    path: Option<Path<String>>,
) -> Json<serde_json::Value> {
    let resource = match path {
        Some(Path(suffix)) => format!("{}/{suffix}", resource_base(&state)),
        None => resource_base(&state),
    };
    Json(gatekeeper_auth::discovery::protected_resource_metadata(
        &resource,
        &resource_base(&state),
    ))
}

pub async fn get_authorization_server_metadata(State(state): State<Arc<BridgeState>>) -> Json<serde_json::Value> {
    Json(gatekeeper_auth::discovery::oauth_authorization_server_metadata(&resource_base(&state)))
}

pub async fn get_openid_configuration(State(state): State<Arc<BridgeState>>) -> Json<serde_json::Value> {
    Json(gatekeeper_auth::discovery::openid_configuration(&resource_base(&state)))
}

/// Builds the issuer/resource base URL from the same configured host the
/// file store uses for `/files/{key}` links, not the server's display
/// name - `server_name` is a human label, not a hostname.
fn resource_base(state: &BridgeState) -> String {
    let host = &state.externalizer_config.host;
    let scheme = if is_local_host(host) { "http" } else { "https" };
    format!("{scheme}://{host}")
}

fn is_local_host(host: &str) -> bool {
    let host_only = host.split(':').next().unwrap_or(host);
    host_only == "localhost" || host_only == "127.0.0.1" || host_only == "[::1]" || host_only == "::1"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_basic_auth_splits_id_and_secret() {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"svc-a:super-secret");
        let header_value = format!("Basic {encoded}");
        let (id, secret) = decode_basic_auth(&header_value).unwrap();
        assert_eq!(id, "svc-a");
        assert_eq!(secret, "super-secret");
    }

    #[test]
    fn decode_basic_auth_rejects_non_basic_schemes() {
        assert!(decode_basic_auth("Bearer abc").is_none());
    }
}
