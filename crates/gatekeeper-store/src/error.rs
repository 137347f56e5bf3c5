use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found or already consumed")]
    NotFound,
    #[error("response too large")]
    ResponseTooLarge,
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
