//! Per-connection signal filters
//!
//! A filter sits on one direction of a connection and sees every signal
//! crossing it that way. It works on a scratch copy ([`FilteredSignal`]) and
//! may:
//!
//! - pass it on untouched ([`FilterVerdict::Forward`]),
//! - rewrite the payload (remap a pointer position, remap a reported size)
//!   and pass it on,
//! - mark it processed (a convention for later handlers, not a stop),
//! - swallow it ([`FilterVerdict::Swallow`]) so the far end never sees it.
//!
//! A filter that returns [`FilterFault`] has its scratch copy thrown away;
//! the signal continues as it was before that filter and the fault is
//! reported to the diagnostic sink.

use std::cell::Cell;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use crate::error::FilterFault;
use crate::geometry::{Point, Rect};
use crate::signal::{Payload, Signal};

/// What to do with a signal after filtering
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterVerdict {
    /// Continue to the next filter, then the far end
    Forward,
    /// Stop here
    Swallow,
}

/// Transform applied to signals crossing a connection
pub trait SignalFilter {
    fn filter(&self, signal: &mut FilteredSignal) -> Result<FilterVerdict, FilterFault>;
}

/// A signal copy a filter is allowed to rewrite
#[derive(Clone, Debug, PartialEq)]
pub struct FilteredSignal {
    signal: Signal,
}

impl FilteredSignal {
    pub fn new(signal: Signal) -> Self {
        Self { signal }
    }

    pub fn into_signal(self) -> Signal {
        self.signal
    }

    /// Rewrite the pointer position; non-pointer signals are left alone
    pub fn map_position<F>(&mut self, f: F) -> Result<(), FilterFault>
    where
        F: FnOnce(Point) -> Result<Point, FilterFault>,
    {
        match self.signal.payload_mut() {
            Payload::MouseDown(p) | Payload::MouseUp(p) | Payload::MouseMove(p) => {
                p.position = f(p.position)?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Rewrite the rect of `SizeChanged` or `Resize`; other signals are left
    /// alone
    pub fn map_rect<F>(&mut self, f: F) -> Result<(), FilterFault>
    where
        F: FnOnce(Rect) -> Result<Rect, FilterFault>,
    {
        match self.signal.payload_mut() {
            Payload::SizeChanged { new_size: rect } | Payload::Resize { to_size: rect } => {
                *rect = f(*rect)?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Replace the payload with another of the same kind
    pub fn replace_payload(&mut self, payload: Payload) -> Result<(), FilterFault> {
        if payload.kind() != self.signal.kind() {
            return Err(FilterFault::new(format!(
                "cannot turn {:?} into {:?}",
                self.signal.kind(),
                payload.kind()
            )));
        }
        *self.signal.payload_mut() = payload;
        Ok(())
    }
}

impl Deref for FilteredSignal {
    type Target = Signal;

    fn deref(&self) -> &Signal {
        &self.signal
    }
}

impl DerefMut for FilteredSignal {
    fn deref_mut(&mut self) -> &mut Signal {
        &mut self.signal
    }
}

/// Filter backed by a closure
pub struct FnFilter<F> {
    f: F,
}

impl<F> SignalFilter for FnFilter<F>
where
    F: Fn(&mut FilteredSignal) -> Result<FilterVerdict, FilterFault>,
{
    fn filter(&self, signal: &mut FilteredSignal) -> Result<FilterVerdict, FilterFault> {
        (self.f)(signal)
    }
}

/// Wrap a closure as a [`SignalFilter`]
pub fn filter_fn<F>(f: F) -> FnFilter<F>
where
    F: Fn(&mut FilteredSignal) -> Result<FilterVerdict, FilterFault>,
{
    FnFilter { f }
}

/// Moves pointer positions into a space whose origin sits at `offset`
///
/// The offset is shared, so the owner can move it (say, after a relayout)
/// without touching the connection. Containers use it to bring pointer
/// positions into a child's local space.
#[derive(Clone, Debug, Default)]
pub struct OffsetFilter {
    offset: Rc<Cell<Point>>,
}

impl OffsetFilter {
    pub fn new(offset: Point) -> Self {
        Self {
            offset: Rc::new(Cell::new(offset)),
        }
    }

    /// Filter reading its offset from `offset`
    pub fn shared(offset: Rc<Cell<Point>>) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> Point {
        self.offset.get()
    }

    pub fn set_offset(&self, offset: Point) {
        self.offset.set(offset);
    }
}

impl SignalFilter for OffsetFilter {
    fn filter(&self, signal: &mut FilteredSignal) -> Result<FilterVerdict, FilterFault> {
        let offset = self.offset.get();
        signal.map_position(|p| Ok(p - offset))?;
        Ok(FilterVerdict::Forward)
    }
}
