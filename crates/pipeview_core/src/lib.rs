//! pipeview core
//!
//! The signal pipeline underneath every pipeview scene:
//!
//! - **Ports**: typed, named endpoints owned by a node
//! - **Connections**: output → input edges, at most one producer per input
//! - **Slots**: per-port subscriber registries, fired synchronously and
//!   depth-first
//! - **Filters**: per-connection interposers that remap or swallow signals
//! - **Update/dirty protocol**: lazy recomputation driven by `Modified`
//!   pushes and `Update` pulls
//! - **Draw boundary**: the `Painter`/`Canvas` contract renderer backends
//!   implement
//!
//! # Example
//!
//! ```rust
//! use pipeview_core::{connect, Context, InputPort, NodeId, OutputPort};
//!
//! let ctx = Context::new();
//! let out = OutputPort::<u32>::new("count", NodeId::next(), &ctx);
//! let input = InputPort::<u32>::new("count", NodeId::next(), &ctx);
//!
//! assert_eq!(input.get(), None);
//! connect(&out, &input).unwrap();
//! out.set(3);
//! assert_eq!(input.get(), Some(3));
//! ```

pub mod connection;
pub mod diagnostics;
pub mod draw;
pub mod error;
pub mod filter;
pub mod geometry;
pub mod input;
pub mod node;
pub mod port;
pub mod signal;
pub mod slots;

pub use connection::{connect, Connection};
pub use diagnostics::{
    CollectingSink, Context, Diagnostic, DiagnosticKind, DiagnosticSink, NullSink, TracingSink,
};
pub use draw::{Canvas, DrawCommand, Painter, PainterRef, RecordingCanvas, RenderError};
pub use error::{FilterFault, GraphError, Result};
pub use filter::{filter_fn, FilterVerdict, FilteredSignal, FnFilter, OffsetFilter, SignalFilter};
pub use geometry::{Affine2D, Color, Point, Rect, Size};
pub use input::{ButtonsHeld, Key, ModifierKey, Modifiers, MouseButton};
pub use node::{
    install_protocol, pull, serve_output, watch_input, Change, NodeCore, NodeId, NodeState,
    NodeStats, Process,
};
pub use port::{InputPort, OutputPort, Port, PortDirection, ValueType};
pub use signal::{Direction, KeyEvent, Payload, PointerEvent, Signal, SignalKind};
pub use slots::{SignalHandler, Slot, Slots, SubscriptionId};
