//! Bearer token extraction, constant-time API-key comparison, and the
//! `WWW-Authenticate` header for 401 responses (spec §6, §7), grounded on
//! `turbomcp-auth::server::{BearerTokenValidator, WwwAuthenticateBuilder}`.

use crate::error::AuthError;
use subtle::ConstantTimeEq;

/// Extracts the token from an `Authorization: Bearer <token>` header
/// value. Case-insensitive on the scheme, per RFC 6750.
pub fn extract_bearer(header_value: &str) -> Result<&str, AuthError> {
    let mut parts = header_value.splitn(2, ' ');
    let scheme = parts.next().unwrap_or("");
    let token = parts.next().unwrap_or("").trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::MissingBearer);
    }
    Ok(token)
}

/// Constant-time equality check for API keys, so a timing side-channel
/// cannot be used to recover a valid key byte-by-byte.
pub fn keys_equal(supplied: &str, expected: &str) -> bool {
    supplied.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Builds the `WWW-Authenticate` header value for a 401 response that
/// points the caller at the protected-resource metadata document
/// (RFC 9728 §5.1).
pub fn www_authenticate(metadata_uri: &str, error: Option<&str>) -> String {
    let mut parts = vec![format!("Bearer resource_metadata=\"{metadata_uri}\"")];
    if let Some(error) = error {
        parts.push(format!("error=\"{error}\""));
    }
    parts.join(", ")
}
