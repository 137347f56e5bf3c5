//! OAuth/OIDC discovery document builders (spec §6), grounded on
//! `turbomcp-auth::server::ProtectedResourceMetadataBuilder`. Shapes only
//! - fetching and caching a remote discovery document is out of scope
//! (spec §1).

use serde_json::{json, Value};

/// `/.well-known/oauth-protected-resource[/*]` (RFC 9728).
pub fn protected_resource_metadata(resource: &str, authorization_server: &str) -> Value {
    json!({
        "resource": resource,
        "authorization_servers": [authorization_server],
        "bearer_methods_supported": ["header"],
    })
}

/// `/.well-known/oauth-authorization-server` (RFC 8414).
pub fn oauth_authorization_server_metadata(issuer: &str) -> Value {
    json!({
        "issuer": issuer,
        "token_endpoint": format!("{issuer}/oauth/token"),
        "grant_types_supported": ["client_credentials", "refresh_token"],
        "token_endpoint_auth_methods_supported": ["client_secret_basic", "client_secret_post"],
    })
}

/// `/.well-known/openid-configuration`. The gateway does not implement an
/// authorization-code/id_token flow, so this mirrors the authorization
/// server document with the OIDC-conventional field names added.
pub fn openid_configuration(issuer: &str) -> Value {
    json!({
        "issuer": issuer,
        "token_endpoint": format!("{issuer}/oauth/token"),
        "grant_types_supported": ["client_credentials", "refresh_token"],
        "response_types_supported": [],
    })
}
