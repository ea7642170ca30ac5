//! Platform events
//!
//! What a window backend reports between two calls to
//! [`WindowBase::poll_events`](crate::WindowBase::poll_events), already
//! translated into pipeview's input vocabulary.

use pipeview_core::{ButtonsHeld, Key, Modifiers, MouseButton, Point};

/// Control flow after processing a batch of events
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ControlFlow {
    /// Keep polling
    #[default]
    Continue,
    /// The window is gone, stop the loop
    Exit,
}

/// A native event, translated
#[derive(Clone, Debug, PartialEq)]
pub enum PlatformEvent {
    KeyDown {
        key: Key,
        modifiers: Modifiers,
    },
    KeyUp {
        key: Key,
        modifiers: Modifiers,
    },
    /// Mouse button or wheel tick pressed
    ButtonDown {
        button: MouseButton,
        /// Position in window coordinates
        position: Point,
        modifiers: Modifiers,
    },
    ButtonUp {
        button: MouseButton,
        position: Point,
        modifiers: Modifiers,
    },
    MouseMove {
        position: Point,
        buttons: ButtonsHeld,
        modifiers: Modifiers,
    },
    /// Window was resized
    Resized {
        /// New width in pixels
        width: u32,
        /// New height in pixels
        height: u32,
    },
    /// Window close was requested (e.g., close button clicked)
    CloseRequested,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_flow_default() {
        assert_eq!(ControlFlow::default(), ControlFlow::Continue);
    }
}
