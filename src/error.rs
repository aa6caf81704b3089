use thiserror::Error;

#[derive(Debug, Error)]
pub enum StudioError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Image error: {0}")]
    ImageError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Request error: {0}")]
    RequestError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl StudioError {
    /// True for bad input rejected before any generation work starts.
    pub fn is_validation(&self) -> bool {
        matches!(self, StudioError::ValidationError(_))
    }
}

impl From<serde_json::Error> for StudioError {
    fn from(e: serde_json::Error) -> Self {
        StudioError::SerializationError(e.to_string())
    }
}

impl From<reqwest::Error> for StudioError {
    fn from(e: reqwest::Error) -> Self {
        StudioError::RequestError(e.to_string())
    }
}

impl From<image::ImageError> for StudioError {
    fn from(e: image::ImageError) -> Self {
        StudioError::ImageError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StudioError>;
