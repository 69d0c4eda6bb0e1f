pub mod config;
pub mod detection;
pub mod error;
pub mod pose;
pub mod video;

pub use config::DetectorConfig;
pub use error::PushupError;
