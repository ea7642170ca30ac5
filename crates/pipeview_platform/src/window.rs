//! Window strategy trait and configuration

use serde::{Deserialize, Serialize};

use pipeview_core::{Canvas, Color, Size};

use crate::error::Result;
use crate::event::PlatformEvent;

/// Which window implementation to use
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Off-screen window recording its frames
    #[default]
    Headless,
    /// The operating system's windowing
    Native,
}

/// Window configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window caption
    pub caption: String,
    /// Initial width in pixels
    pub width: u32,
    /// Initial height in pixels
    pub height: u32,
    /// Whether the window can be resized
    pub resizable: bool,
    /// Colour the window is cleared with before each frame
    pub background: Color,
    pub backend: Backend,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            caption: "pipeview".to_string(),
            width: 800,
            height: 600,
            resizable: true,
            background: Color::WHITE,
            backend: Backend::Headless,
        }
    }
}

impl WindowConfig {
    /// Create a new window configuration with a caption
    pub fn new(caption: impl Into<String>) -> Self {
        Self {
            caption: caption.into(),
            ..Default::default()
        }
    }

    /// Parse a configuration from TOML; missing keys take their defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Set the window caption
    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = caption.into();
        self
    }

    /// Set the window size
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set whether the window is resizable
    pub fn resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }

    /// Set the background colour
    pub fn background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }

    /// Select the backend
    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn resolution(&self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }
}

/// Window backend
///
/// One implementation per platform, picked at run time from
/// [`WindowConfig::backend`]. The app-level window drives it: it polls
/// events, turns them into signals, and draws into [`canvas`](Self::canvas)
/// before calling [`present`](Self::present).
pub trait WindowBase {
    /// Caption given at creation
    fn caption(&self) -> &str;

    /// Current size in pixels
    fn resolution(&self) -> Size;

    /// Close the window and release its resources
    fn close(&mut self);

    fn is_closed(&self) -> bool;

    /// Drain every event accumulated since the last call
    fn poll_events(&mut self) -> Vec<PlatformEvent>;

    /// Surface for the next frame
    fn canvas(&mut self) -> &mut dyn Canvas;

    /// Show what was drawn into the canvas since the last present
    fn present(&mut self);
}

impl<W: WindowBase + ?Sized> WindowBase for Box<W> {
    fn caption(&self) -> &str {
        (**self).caption()
    }

    fn resolution(&self) -> Size {
        (**self).resolution()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }

    fn poll_events(&mut self) -> Vec<PlatformEvent> {
        (**self).poll_events()
    }

    fn canvas(&mut self) -> &mut dyn Canvas {
        (**self).canvas()
    }

    fn present(&mut self) {
        (**self).present()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = WindowConfig::new("zoom demo")
            .size(1024, 768)
            .background(Color::BLACK);
        assert_eq!(config.caption, "zoom demo");
        assert_eq!(config.resolution(), Size::new(1024.0, 768.0));
        assert_eq!(config.background, Color::BLACK);
        assert_eq!(config.backend, Backend::Headless);
    }

    #[test]
    fn test_from_toml_uses_defaults_for_missing_keys() {
        let config = WindowConfig::from_toml_str(
            r#"
            caption = "viewer"
            width = 320
            backend = "native"
            "#,
        )
        .unwrap();
        assert_eq!(config.caption, "viewer");
        assert_eq!(config.width, 320);
        assert_eq!(config.height, 600);
        assert_eq!(config.backend, Backend::Native);
    }

    #[test]
    fn test_from_toml_rejects_bad_types() {
        assert!(WindowConfig::from_toml_str("width = \"wide\"").is_err());
    }
}
