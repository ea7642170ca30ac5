//! pipeview Platform Abstraction Layer
//!
//! Platform-agnostic traits and types for the windows a pipeview scene is
//! shown in.
//!
//! # Architecture
//!
//! - [`WindowBase`] - one window backend: events in, frames out
//! - [`Platform`] - creates the windows of one backend
//! - [`create_window`] - picks the backend named in a [`WindowConfig`]
//!
//! The only backend shipped here is [`HeadlessWindow`], which records its
//! frames and takes its events from the host.
//!
//! # Example
//!
//! ```
//! use pipeview_platform::*;
//!
//! let mut window = create_window(&WindowConfig::new("demo").size(320, 240)).unwrap();
//! assert!(window.poll_events().is_empty());
//! window.close();
//! assert!(window.is_closed());
//! ```

mod error;
mod event;
mod headless;
mod platform;
mod window;

// Re-export all public types
pub use error::{PlatformError, Result};
pub use event::{ControlFlow, PlatformEvent};
pub use headless::HeadlessWindow;
pub use platform::{create_window, HeadlessPlatform, Platform};
pub use window::{Backend, WindowBase, WindowConfig};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{PlatformError, Result};
    pub use crate::event::{ControlFlow, PlatformEvent};
    pub use crate::platform::{create_window, Platform};
    pub use crate::window::{Backend, WindowBase, WindowConfig};
}
