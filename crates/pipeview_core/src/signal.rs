//! Signals flowing along connections
//!
//! A [`Signal`] is a tagged value ([`Payload`]) plus a `processed` flag. The
//! set of kinds is closed: [`SignalKind`] lists every kind, including a few
//! abstract ones that exist only so handlers can subscribe to a whole family.
//!
//! # Kind hierarchy
//!
//! ```text
//! Any
//! ├── Modified ──────────── forward (producer → consumer)
//! │   ├── ContentChanged
//! │   │   └── SizeChanged
//! │   └── InputSet
//! ├── InputAdded ────────── backward
//! ├── Update ────────────── backward
//! ├── Resize ────────────── backward
//! └── Input ─────────────── backward
//!     ├── Key
//!     │   ├── KeyDown
//!     │   └── KeyUp
//!     └── Pointer
//!         ├── MouseDown
//!         ├── MouseUp
//!         └── MouseMove
//! ```
//!
//! A handler registered for a kind receives every signal whose kind is that
//! kind or one of its descendants, so a `ContentChanged` subscriber also sees
//! `SizeChanged`.

use crate::geometry::{Point, Rect};
use crate::input::{ButtonsHeld, Key, Modifiers, MouseButton};

/// Travel direction of a signal along a connection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Producer → consumer (output port → input port)
    Forward,
    /// Consumer → producer (input port → output port)
    Backward,
}

/// Every signal kind known to the graph
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignalKind {
    /// Matches every signal (abstract)
    Any,
    /// Something a consumer depends on changed
    Modified,
    ContentChanged,
    SizeChanged,
    /// The consumer's input got a (new) producer
    InputSet,
    /// The producer's output got a new consumer
    InputAdded,
    /// Pull request: recompute if dirty
    Update,
    /// The consumer offers a new available area
    Resize,
    /// All interaction signals (abstract)
    Input,
    /// Keyboard signals (abstract)
    Key,
    KeyDown,
    KeyUp,
    /// Pointer signals (abstract)
    Pointer,
    MouseDown,
    MouseUp,
    MouseMove,
}

impl SignalKind {
    /// Every kind, in declaration order
    pub const ALL: [SignalKind; 16] = [
        SignalKind::Any,
        SignalKind::Modified,
        SignalKind::ContentChanged,
        SignalKind::SizeChanged,
        SignalKind::InputSet,
        SignalKind::InputAdded,
        SignalKind::Update,
        SignalKind::Resize,
        SignalKind::Input,
        SignalKind::Key,
        SignalKind::KeyDown,
        SignalKind::KeyUp,
        SignalKind::Pointer,
        SignalKind::MouseDown,
        SignalKind::MouseUp,
        SignalKind::MouseMove,
    ];

    /// Immediate parent in the kind hierarchy
    pub fn parent(self) -> Option<SignalKind> {
        use SignalKind::*;
        match self {
            Any => None,
            Modified | InputAdded | Update | Resize | Input => Some(Any),
            ContentChanged | InputSet => Some(Modified),
            SizeChanged => Some(ContentChanged),
            Key | Pointer => Some(Input),
            KeyDown | KeyUp => Some(Key),
            MouseDown | MouseUp | MouseMove => Some(Pointer),
        }
    }

    /// True if `self` is `ancestor` or one of its descendants
    pub fn is_a(self, ancestor: SignalKind) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind == ancestor {
                return true;
            }
            current = kind.parent();
        }
        false
    }

    /// Abstract kinds can be subscribed to but never fired
    pub fn is_abstract(self) -> bool {
        matches!(
            self,
            SignalKind::Any | SignalKind::Input | SignalKind::Key | SignalKind::Pointer
        )
    }

    /// Travel direction, `None` for `Any`
    pub fn direction(self) -> Option<Direction> {
        if self == SignalKind::Any {
            None
        } else if self.is_a(SignalKind::Modified) {
            Some(Direction::Forward)
        } else {
            Some(Direction::Backward)
        }
    }
}

/// Payload of a keyboard signal
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

/// Payload of a pointer signal
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    /// Button that changed state, `None` for moves
    pub button: Option<MouseButton>,
    /// Position in the coordinate space of the view receiving the signal
    pub position: Point,
    pub buttons: ButtonsHeld,
    pub modifiers: Modifiers,
}

/// Concrete signal payloads, one per non-abstract kind
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Modified,
    ContentChanged,
    SizeChanged { new_size: Rect },
    InputSet,
    InputAdded,
    Update,
    Resize { to_size: Rect },
    KeyDown(KeyEvent),
    KeyUp(KeyEvent),
    MouseDown(PointerEvent),
    MouseUp(PointerEvent),
    MouseMove(PointerEvent),
}

impl Payload {
    pub fn kind(&self) -> SignalKind {
        match self {
            Payload::Modified => SignalKind::Modified,
            Payload::ContentChanged => SignalKind::ContentChanged,
            Payload::SizeChanged { .. } => SignalKind::SizeChanged,
            Payload::InputSet => SignalKind::InputSet,
            Payload::InputAdded => SignalKind::InputAdded,
            Payload::Update => SignalKind::Update,
            Payload::Resize { .. } => SignalKind::Resize,
            Payload::KeyDown(_) => SignalKind::KeyDown,
            Payload::KeyUp(_) => SignalKind::KeyUp,
            Payload::MouseDown(_) => SignalKind::MouseDown,
            Payload::MouseUp(_) => SignalKind::MouseUp,
            Payload::MouseMove(_) => SignalKind::MouseMove,
        }
    }
}

/// A signal in flight
///
/// Handlers get `&mut Signal` but may only flip the `processed` flag; the
/// payload can be rewritten only by filters, through
/// [`FilteredSignal`](crate::filter::FilteredSignal), on a per-connection copy.
#[derive(Clone, Debug, PartialEq)]
pub struct Signal {
    payload: Payload,
    processed: bool,
}

impl Signal {
    pub fn new(payload: Payload) -> Self {
        Self {
            payload,
            processed: false,
        }
    }

    pub fn modified() -> Self {
        Self::new(Payload::Modified)
    }

    pub fn content_changed() -> Self {
        Self::new(Payload::ContentChanged)
    }

    pub fn size_changed(new_size: Rect) -> Self {
        Self::new(Payload::SizeChanged { new_size })
    }

    pub fn update() -> Self {
        Self::new(Payload::Update)
    }

    pub fn resize(to_size: Rect) -> Self {
        Self::new(Payload::Resize { to_size })
    }

    pub fn key_down(key: Key, modifiers: Modifiers) -> Self {
        Self::new(Payload::KeyDown(KeyEvent { key, modifiers }))
    }

    pub fn key_up(key: Key, modifiers: Modifiers) -> Self {
        Self::new(Payload::KeyUp(KeyEvent { key, modifiers }))
    }

    pub fn mouse_down(button: MouseButton, position: Point, modifiers: Modifiers) -> Self {
        let buttons = ButtonsHeld {
            left: button == MouseButton::Left,
            right: button == MouseButton::Right,
            middle: button == MouseButton::Middle,
        };
        Self::new(Payload::MouseDown(PointerEvent {
            button: Some(button),
            position,
            buttons,
            modifiers,
        }))
    }

    pub fn mouse_up(button: MouseButton, position: Point, modifiers: Modifiers) -> Self {
        Self::new(Payload::MouseUp(PointerEvent {
            button: Some(button),
            position,
            buttons: ButtonsHeld::NONE,
            modifiers,
        }))
    }

    pub fn mouse_move(position: Point, buttons: ButtonsHeld, modifiers: Modifiers) -> Self {
        Self::new(Payload::MouseMove(PointerEvent {
            button: None,
            position,
            buttons,
            modifiers,
        }))
    }

    pub fn kind(&self) -> SignalKind {
        self.payload.kind()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub(crate) fn payload_mut(&mut self) -> &mut Payload {
        &mut self.payload
    }

    pub fn processed(&self) -> bool {
        self.processed
    }

    /// Claim the signal; later handlers should leave it alone
    pub fn mark_processed(&mut self) {
        self.processed = true;
    }

    /// Pointer payload, if this is a pointer signal
    pub fn pointer(&self) -> Option<&PointerEvent> {
        match &self.payload {
            Payload::MouseDown(p) | Payload::MouseUp(p) | Payload::MouseMove(p) => Some(p),
            _ => None,
        }
    }

    /// Keyboard payload, if this is a key signal
    pub fn key(&self) -> Option<&KeyEvent> {
        match &self.payload {
            Payload::KeyDown(k) | Payload::KeyUp(k) => Some(k),
            _ => None,
        }
    }

    /// Pointer position, if this is a pointer signal
    pub fn position(&self) -> Option<Point> {
        self.pointer().map(|p| p.position)
    }

    /// Rect carried by `SizeChanged` or `Resize`
    pub fn rect(&self) -> Option<Rect> {
        match &self.payload {
            Payload::SizeChanged { new_size } => Some(*new_size),
            Payload::Resize { to_size } => Some(*to_size),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_changed_is_content_changed() {
        assert!(SignalKind::SizeChanged.is_a(SignalKind::ContentChanged));
        assert!(SignalKind::SizeChanged.is_a(SignalKind::Modified));
        assert!(!SignalKind::ContentChanged.is_a(SignalKind::SizeChanged));
    }

    #[test]
    fn test_every_kind_descends_from_any() {
        for kind in SignalKind::ALL {
            assert!(kind.is_a(SignalKind::Any), "{kind:?}");
        }
    }

    #[test]
    fn test_directions() {
        assert_eq!(SignalKind::SizeChanged.direction(), Some(Direction::Forward));
        assert_eq!(SignalKind::InputSet.direction(), Some(Direction::Forward));
        assert_eq!(SignalKind::Update.direction(), Some(Direction::Backward));
        assert_eq!(SignalKind::MouseMove.direction(), Some(Direction::Backward));
        assert_eq!(SignalKind::InputAdded.direction(), Some(Direction::Backward));
        assert_eq!(SignalKind::Any.direction(), None);
    }

    #[test]
    fn test_payload_kind_is_concrete() {
        let signals = [
            Signal::modified(),
            Signal::content_changed(),
            Signal::size_changed(Rect::ZERO),
            Signal::update(),
            Signal::resize(Rect::ZERO),
            Signal::key_down(Key::R, Modifiers::NONE),
            Signal::mouse_move(Point::ZERO, ButtonsHeld::NONE, Modifiers::NONE),
        ];
        for signal in signals {
            assert!(!signal.kind().is_abstract());
            assert!(!signal.processed());
        }
    }

    #[test]
    fn test_mouse_down_sets_held_button() {
        let signal = Signal::mouse_down(MouseButton::Left, Point::new(1.0, 2.0), Modifiers::CTRL);
        let pointer = signal.pointer().unwrap();
        assert!(pointer.buttons.left);
        assert_eq!(pointer.position, Point::new(1.0, 2.0));
    }
}
