use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing or malformed Authorization header")]
    MissingBearer,

    #[error("invalid API key")]
    InvalidApiKey,

    #[error("unsupported grant_type `{0}`")]
    UnsupportedGrantType(String),

    #[error("invalid client credentials")]
    InvalidClient,

    #[error("invalid or expired refresh token")]
    InvalidGrant,

    #[error("missing required field `{0}`")]
    InvalidRequest(String),
}

impl AuthError {
    /// The OAuth 2.0 error code (RFC 6749 §5.2) this maps to, for the
    /// `/oauth/token` error envelope `{error, error_description}`.
    pub fn oauth_code(&self) -> &'static str {
        match self {
            AuthError::UnsupportedGrantType(_) => "unsupported_grant_type",
            AuthError::InvalidClient => "invalid_client",
            AuthError::InvalidGrant => "invalid_grant",
            AuthError::InvalidRequest(_) => "invalid_request",
            AuthError::MissingBearer | AuthError::InvalidApiKey => "invalid_client",
        }
    }
}
