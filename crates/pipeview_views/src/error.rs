//! View error types

use thiserror::Error;

/// Errors raised while loading view configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The TOML text could not be parsed
    #[error("failed to parse view configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration parsed but holds unusable values
    #[error("invalid view configuration: {0}")]
    Invalid(String),
}

/// Result type for view configuration
pub type Result<T> = std::result::Result<T, ConfigError>;
