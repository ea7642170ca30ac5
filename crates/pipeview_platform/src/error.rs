//! Platform error types

use thiserror::Error;

/// Platform-related errors
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Failed to create window
    #[error("Failed to create window: {0}")]
    WindowCreation(String),

    /// The requested backend is not available in this build
    #[error("Platform not supported: {0}")]
    Unsupported(String),

    /// Window configuration could not be read
    #[error("Invalid window configuration: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result type for platform operations
pub type Result<T> = std::result::Result<T, PlatformError>;
