//! Error types for frame payload decoding.

use thiserror::Error;
use viewer_common::ViewerError;

/// Errors that can occur while decoding a frame's geometry payload.
#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Failed to decompress payload: {0}")]
    Decompression(#[from] std::io::Error),

    #[error("Invalid geometry document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing document attribute: {0}")]
    MissingAttribute(&'static str),

    #[error("Invalid feature {index}: {message}")]
    InvalidFeature { index: usize, message: String },
}

/// Result type for payload decoding.
pub type PayloadResult<T> = std::result::Result<T, PayloadError>;

impl From<PayloadError> for ViewerError {
    fn from(err: PayloadError) -> Self {
        ViewerError::Decode(err.to_string())
    }
}
