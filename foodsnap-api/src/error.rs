use foodsnap_eye::VisionError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// HTTP status the request layer should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Internal(_) | ApiError::Config(_) => 500,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            detail: self.to_string(),
        }
    }
}

impl From<VisionError> for ApiError {
    fn from(err: VisionError) -> Self {
        match err {
            VisionError::UnsupportedMediaType(_) => {
                ApiError::BadRequest("Invalid image type. Only JPEG and PNG allowed.".to_string())
            }
            e if e.is_client_error() => ApiError::BadRequest(e.to_string()),
            e => {
                error!("Inference pipeline failed: {}", e);
                ApiError::Internal(e.to_string())
            }
        }
    }
}

/// Error body returned alongside a non-success status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

pub type Result<T> = std::result::Result<T, ApiError>;
