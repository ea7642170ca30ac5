//! pipeview Views
//!
//! Views built on the pipeview core. Every view is a process node whose
//! `painter` output carries a [`PainterRef`](pipeview_core::PainterRef):
//!
//! - **Leaves**: [`TextView`], [`RectView`]
//! - **Container**: [`ContainerView`] places any number of children with a
//!   [`Placing`] strategy
//! - **Switch**: [`Switch`], a label next to a toggle box with a `value`
//!   output
//! - **Adapters**: [`ZoomView`] (pan and zoom, optionally fit to the window)
//!   and [`RotateView`] wrap one child and remap pointer positions into the
//!   child's space
//!
//! # Example
//!
//! ```rust
//! use pipeview_core::{connect, Color, Context, Rect};
//! use pipeview_views::{ContainerView, Placing, RectView, ZoomView};
//!
//! let ctx = Context::new();
//! let a = RectView::new(Rect::new(0.0, 0.0, 10.0, 5.0), Color::BLUE, &ctx);
//! let b = RectView::new(Rect::new(0.0, 0.0, 8.0, 5.0), Color::GRAY, &ctx);
//!
//! let row = ContainerView::new(Placing::horizontal(), &ctx);
//! row.add_input(a.output()).unwrap();
//! row.add_input(b.output()).unwrap();
//!
//! let zoom = ZoomView::new(&ctx);
//! connect(row.output(), zoom.input()).unwrap();
//! ```

pub mod container;
pub mod error;
pub mod painters;
pub mod rect;
pub mod rotate;
pub mod switch;
pub mod text;
pub mod zoom;

mod relay;
#[cfg(test)]
mod testing;

pub use container::{ContainerPainter, ContainerView, Placing};
pub use error::{ConfigError, Result};
pub use painters::{empty_painter, EmptyPainter, RecordedPainter, RectPainter, TextPainter};
pub use rect::RectView;
pub use rotate::{RotatePainter, RotateView, Rotation};
pub use switch::{Switch, SwitchImpl};
pub use text::{EstimatedTextMeasurer, TextMeasurer, TextMetrics, TextStyle, TextView};
pub use zoom::{ZoomConfig, ZoomPainter, ZoomView};
