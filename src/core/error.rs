use thiserror::Error;

#[derive(Debug, Error)]
pub enum PushupError {
    #[error("Capture device #{index} unavailable: {reason}")]
    DeviceUnavailable { index: u32, reason: String },
    #[error("Frame read failed: {0}")]
    ReadFailed(String),
    #[error("Capture device lost: {0}")]
    DeviceLost(String),
    #[error("Preprocess failed: {0}")]
    Preprocess(String),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Invalid config: {0}")]
    Config(String),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
