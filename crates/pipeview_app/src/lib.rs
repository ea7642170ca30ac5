//! pipeview Application Driver
//!
//! The [`Window`] node connects a scene to a window backend from
//! `pipeview_platform`. Hosts call [`Window::step`] (or
//! [`Window::process_events`] and [`Window::redraw`] separately) once per
//! turn of their event loop.
//!
//! # Example
//!
//! ```rust
//! use pipeview_app::Window;
//! use pipeview_core::{Color, Context, Rect};
//! use pipeview_platform::{ControlFlow, WindowConfig};
//! use pipeview_views::RectView;
//!
//! let ctx = Context::new();
//! let mut window = Window::open(&WindowConfig::new("demo").size(320, 240), &ctx).unwrap();
//! let rect = RectView::new(Rect::new(10.0, 10.0, 100.0, 50.0), Color::BLUE, &ctx);
//! window.attach(rect.output()).unwrap();
//!
//! assert_eq!(window.step(), ControlFlow::Continue);
//! assert_eq!(window.frames(), 1);
//! ```

mod error;
mod window;

pub use error::{AppError, Result};
pub use window::Window;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{AppError, Result};
    pub use crate::window::Window;
    pub use pipeview_platform::prelude::*;
}
