//! Platform trait and backend selection

use crate::error::{PlatformError, Result};
use crate::headless::HeadlessWindow;
use crate::window::{Backend, WindowBase, WindowConfig};

/// Platform abstraction trait
///
/// Implemented by each backend to create its windows.
pub trait Platform {
    /// The window type for this platform
    type Window: WindowBase;

    /// Get the platform name
    fn name(&self) -> &'static str;

    fn create_window(&self, config: &WindowConfig) -> Result<Self::Window>;
}

/// Platform whose windows never reach a screen
#[derive(Clone, Copy, Debug, Default)]
pub struct HeadlessPlatform;

impl Platform for HeadlessPlatform {
    type Window = HeadlessWindow;

    fn name(&self) -> &'static str {
        "headless"
    }

    fn create_window(&self, config: &WindowConfig) -> Result<HeadlessWindow> {
        if config.width == 0 || config.height == 0 {
            return Err(PlatformError::WindowCreation(format!(
                "`{}` has an empty size {}x{}",
                config.caption, config.width, config.height
            )));
        }
        Ok(HeadlessWindow::new(config))
    }
}

/// Create a window with the backend named in `config`
pub fn create_window(config: &WindowConfig) -> Result<Box<dyn WindowBase>> {
    match config.backend {
        Backend::Headless => {
            let window = HeadlessPlatform.create_window(config)?;
            tracing::debug!(
                target: "pipeview::platform",
                caption = %config.caption,
                "created headless window"
            );
            Ok(Box::new(window))
        }
        Backend::Native => Err(PlatformError::Unsupported(
            "no native window backend in this build".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_backend_is_selected() {
        let window = create_window(&WindowConfig::new("test")).unwrap();
        assert_eq!(window.caption(), "test");
        assert!(!window.is_closed());
    }

    #[test]
    fn test_native_backend_is_unsupported() {
        let config = WindowConfig::new("test").backend(Backend::Native);
        assert!(matches!(
            create_window(&config),
            Err(PlatformError::Unsupported(_))
        ));
    }

    #[test]
    fn test_empty_window_is_rejected() {
        let config = WindowConfig::new("tiny").size(0, 10);
        assert!(matches!(
            HeadlessPlatform.create_window(&config),
            Err(PlatformError::WindowCreation(_))
        ));
    }
}
