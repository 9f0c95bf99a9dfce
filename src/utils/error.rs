use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocScanError {
    #[error("Image processing error: {0}")]
    ImageProcessingError(String),
    #[error("Recognition error: {0}")]
    RecognitionError(String),
    #[error("No usable text could be extracted from the image")]
    NoUsableText,
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}

impl From<image::ImageError> for DocScanError {
    fn from(err: image::ImageError) -> Self {
        DocScanError::ImageProcessingError(format!("Failed to load image: {}", err))
    }
}
