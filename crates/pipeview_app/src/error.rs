//! Error types for pipeview_app

use thiserror::Error;

use pipeview_core::{GraphError, RenderError};
use pipeview_platform::PlatformError;

/// Errors surfaced by the window driver
#[derive(Error, Debug)]
pub enum AppError {
    /// The scene could not be attached to the window
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Windowing failed
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// A frame could not be drawn
    #[error("Rendering failed: {0}")]
    Render(#[from] RenderError),
}

/// Result type for app operations
pub type Result<T> = std::result::Result<T, AppError>;
