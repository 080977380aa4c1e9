use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Invalid card number pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error("Failed to read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),
    #[error("Invalid configuration JSON: {0}")]
    ConfigParse(#[from] serde_json::Error),
    #[error("Invalid frames file: {0}")]
    InvalidFrames(String),
    #[error("Failed to spawn scan thread: {0}")]
    ThreadSpawn(std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScanError>;
