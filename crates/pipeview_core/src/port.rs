//! Typed, named ports
//!
//! A [`Port`] is the erased handle the graph works with: it knows its name,
//! direction, value type and owner, carries the port's slot registry and,
//! for outputs, the current value. [`OutputPort<T>`] and [`InputPort<T>`]
//! wrap a port with the value type fixed at compile time; nodes keep the
//! typed wrappers and hand the erased port to the graph.
//!
//! An input has at most one producer and owns the edge to it. An output
//! only keeps weak references to its edges, so releasing an input (or its
//! node) releases the connection and every filter attached to it.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use crate::connection::{Connection, Edge};
use crate::diagnostics::{Context, Diagnostic, DiagnosticKind};
use crate::error::{GraphError, Result};
use crate::node::NodeId;
use crate::signal::{Direction, Signal, SignalKind};
use crate::slots::{run_handlers, SignalHandler, Slot, Slots, SubscriptionId};

/// Side of a connection a port sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortDirection {
    /// Consumes a value from one producer
    Input,
    /// Produces a value for any number of consumers
    Output,
}

impl PortDirection {
    /// Direction in which signals fired on this port travel
    pub fn fires(self) -> Direction {
        match self {
            PortDirection::Input => Direction::Backward,
            PortDirection::Output => Direction::Forward,
        }
    }
}

/// Runtime identity of the value a port carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueType {
    id: TypeId,
    name: &'static str,
}

impl ValueType {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

pub(crate) struct PortInner {
    name: String,
    direction: PortDirection,
    value_type: ValueType,
    owner: NodeId,
    ctx: Context,
    slots: RefCell<Slots>,
    value: RefCell<Option<Box<dyn Any>>>,
    /// Inputs only: the edge to the producer
    producer: RefCell<Option<Rc<Edge>>>,
    /// Outputs only: edges to consumers, in connection order
    consumers: RefCell<SmallVec<[Weak<Edge>; 2]>>,
}

impl PortInner {
    /// Deliver `signal` to this port's matching subscribers
    pub(crate) fn deliver(&self, signal: &mut Signal) {
        let handlers = self.slots.borrow().matching(signal.kind());
        tracing::trace!(
            target: "pipeview::port",
            port = %self.name,
            kind = ?signal.kind(),
            handlers = handlers.len(),
            "deliver"
        );
        run_handlers(&handlers, signal);
    }

    /// Send `signal` across every connection of this port
    pub(crate) fn fire(this: &Rc<PortInner>, signal: &mut Signal) {
        let travel = this.direction.fires();
        if signal.kind().direction() != Some(travel) {
            this.ctx.report(Diagnostic::new(
                DiagnosticKind::MisroutedSignal,
                this.name.clone(),
                format!(
                    "{:?} cannot travel {:?} from an {:?} port",
                    signal.kind(),
                    travel,
                    this.direction
                ),
            ));
            tracing::warn!(
                target: "pipeview::port",
                port = %this.name,
                kind = ?signal.kind(),
                "misrouted signal dropped"
            );
            return;
        }

        match this.direction {
            PortDirection::Output => {
                let edges: SmallVec<[Rc<Edge>; 2]> = {
                    let mut consumers = this.consumers.borrow_mut();
                    consumers.retain(|e| e.strong_count() > 0);
                    consumers.iter().filter_map(Weak::upgrade).collect()
                };
                for edge in edges {
                    edge.carry(Direction::Forward, signal);
                }
            }
            PortDirection::Input => {
                let edge = this.producer.borrow().clone();
                if let Some(edge) = edge {
                    edge.carry(Direction::Backward, signal);
                }
            }
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn context(&self) -> &Context {
        &self.ctx
    }

    pub(crate) fn add_consumer(&self, edge: &Rc<Edge>) {
        self.consumers.borrow_mut().push(Rc::downgrade(edge));
    }

    pub(crate) fn remove_consumer(&self, edge: &Rc<Edge>) {
        self.consumers
            .borrow_mut()
            .retain(|e| e.strong_count() > 0 && !std::ptr::eq(e.as_ptr(), Rc::as_ptr(edge)));
    }

    pub(crate) fn replace_producer(&self, edge: Option<Rc<Edge>>) -> Option<Rc<Edge>> {
        std::mem::replace(&mut *self.producer.borrow_mut(), edge)
    }

    /// Drop the producer edge if it is `edge`
    pub(crate) fn release_producer(&self, edge: &Rc<Edge>) -> bool {
        let mut producer = self.producer.borrow_mut();
        match producer.as_ref() {
            Some(current) if Rc::ptr_eq(current, edge) => {
                *producer = None;
                true
            }
            _ => false,
        }
    }
}

/// Erased port handle
///
/// Cloning is cheap and yields a handle to the same port.
#[derive(Clone)]
pub struct Port {
    inner: Rc<PortInner>,
}

impl Port {
    pub fn new<T: 'static>(
        name: impl Into<String>,
        direction: PortDirection,
        owner: NodeId,
        ctx: &Context,
    ) -> Self {
        Self {
            inner: Rc::new(PortInner {
                name: name.into(),
                direction,
                value_type: ValueType::of::<T>(),
                owner,
                ctx: ctx.clone(),
                slots: RefCell::new(Slots::new()),
                value: RefCell::new(None),
                producer: RefCell::new(None),
                consumers: RefCell::new(SmallVec::new()),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<PortInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn inner(&self) -> &Rc<PortInner> {
        &self.inner
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn direction(&self) -> PortDirection {
        self.inner.direction
    }

    pub fn value_type(&self) -> ValueType {
        self.inner.value_type
    }

    pub fn owner(&self) -> NodeId {
        self.inner.owner
    }

    /// Same underlying port
    pub fn ptr_eq(&self, other: &Port) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // =========================================================================
    // Slots
    // =========================================================================

    /// Subscribe `handler` to signals of `kind` (and its subkinds) arriving
    /// at this port
    pub fn register_callback<F>(&self, kind: SignalKind, owner: NodeId, handler: F) -> SubscriptionId
    where
        F: Fn(&mut Signal) + 'static,
    {
        let handler: SignalHandler = Rc::new(handler);
        self.inner.slots.borrow_mut().subscribe(kind, owner, handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.slots.borrow_mut().unsubscribe(id)
    }

    pub fn unsubscribe_owner(&self, owner: NodeId) -> usize {
        self.inner.slots.borrow_mut().unsubscribe_owner(owner)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.slots.borrow().len()
    }

    /// Declare that this port emits `kind` and get the emission point
    pub fn register_slot(&self, kind: SignalKind) -> Slot {
        self.inner.slots.borrow_mut().declare(kind);
        Slot::new(kind, Rc::downgrade(&self.inner))
    }

    /// Kinds declared through [`register_slot`](Self::register_slot)
    pub fn declared_slots(&self) -> Vec<SignalKind> {
        self.inner.slots.borrow().declared().to_vec()
    }

    /// Fire `signal` across every connection of this port
    ///
    /// Outputs fire forward to their consumers, inputs fire backward to their
    /// producer. Subscribers of this port itself are not called. The whole
    /// cascade has completed when this returns.
    pub fn fire(&self, signal: &mut Signal) {
        PortInner::fire(&self.inner, signal);
    }

    /// Deliver `signal` to this port's own subscribers, bypassing connections
    pub fn deliver(&self, signal: &mut Signal) {
        self.inner.deliver(signal);
    }

    // =========================================================================
    // Links
    // =========================================================================

    pub fn is_connected(&self) -> bool {
        match self.inner.direction {
            PortDirection::Input => self.inner.producer.borrow().is_some(),
            PortDirection::Output => self.connection_count() > 0,
        }
    }

    /// Live connections touching this port
    pub fn connection_count(&self) -> usize {
        match self.inner.direction {
            PortDirection::Input => usize::from(self.inner.producer.borrow().is_some()),
            PortDirection::Output => self
                .inner
                .consumers
                .borrow()
                .iter()
                .filter(|e| e.strong_count() > 0)
                .count(),
        }
    }

    /// Handle to the producer connection of an input
    pub fn connection(&self) -> Option<Connection> {
        self.inner
            .producer
            .borrow()
            .as_ref()
            .map(Connection::from_edge)
    }

    /// Handles to every consumer connection of an output
    pub fn connections(&self) -> Vec<Connection> {
        match self.inner.direction {
            PortDirection::Input => self.connection().into_iter().collect(),
            PortDirection::Output => self
                .inner
                .consumers
                .borrow()
                .iter()
                .filter_map(Weak::upgrade)
                .map(|edge| Connection::from_edge(&edge))
                .collect(),
        }
    }

    /// Port feeding this input
    pub fn producer(&self) -> Option<Port> {
        let edge = self.inner.producer.borrow().clone()?;
        edge.source().map(Port::from_inner)
    }

    /// Inputs fed by this output
    pub fn consumers(&self) -> Vec<Port> {
        self.inner
            .consumers
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .filter_map(|edge| edge.target())
            .map(Port::from_inner)
            .collect()
    }

    /// Release the producer of an input, notifying the input with `Modified`
    pub fn disconnect(&self) -> bool {
        match self.connection() {
            Some(connection) => connection.disconnect(),
            None => false,
        }
    }

    /// Unlink every edge and drop every subscriber
    ///
    /// Used when the owning node goes away. Inputs that were fed from this
    /// port receive `Modified` once they are unlinked, the same as after a
    /// disconnect.
    pub fn detach(&self) {
        if let Some(edge) = self.inner.replace_producer(None) {
            if let Some(source) = edge.source() {
                source.remove_consumer(&edge);
            }
        }
        let consumers: SmallVec<[Weak<Edge>; 2]> = std::mem::take(&mut *self.inner.consumers.borrow_mut());
        let mut orphans: SmallVec<[Rc<PortInner>; 2]> = SmallVec::new();
        for edge in consumers.iter().filter_map(Weak::upgrade) {
            if let Some(target) = edge.target() {
                target.release_producer(&edge);
                orphans.push(target);
            }
        }
        *self.inner.slots.borrow_mut() = Slots::new();
        *self.inner.value.borrow_mut() = None;

        for target in orphans {
            tracing::debug!(target: "pipeview::port", input = %target.name(), "producer dropped");
            target.deliver(&mut Signal::modified());
        }
    }

    // =========================================================================
    // Values
    // =========================================================================

    fn store(&self, value: Option<Box<dyn Any>>) {
        *self.inner.value.borrow_mut() = value;
    }

    fn load<T: Clone + 'static>(&self) -> Option<T> {
        self.inner
            .value
            .borrow()
            .as_ref()
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }
}

impl AsRef<Port> for Port {
    fn as_ref(&self) -> &Port {
        self
    }
}

impl fmt::Debug for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Port")
            .field("name", &self.inner.name)
            .field("direction", &self.inner.direction)
            .field("type", &self.inner.value_type.name)
            .field("owner", &self.inner.owner)
            .finish()
    }
}

// =============================================================================
// Typed wrappers
// =============================================================================

/// Output port producing values of type `T`
pub struct OutputPort<T> {
    port: Port,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Clone + 'static> OutputPort<T> {
    pub fn new(name: impl Into<String>, owner: NodeId, ctx: &Context) -> Self {
        Self {
            port: Port::new::<T>(name, PortDirection::Output, owner, ctx),
            _marker: PhantomData,
        }
    }

    /// Publish a new value; consumers see it on their next read
    pub fn set(&self, value: T) {
        self.port.store(Some(Box::new(value)));
    }

    pub fn clear(&self) {
        self.port.store(None);
    }

    pub fn value(&self) -> Option<T> {
        self.port.load()
    }

    pub fn port(&self) -> &Port {
        &self.port
    }
}

impl<T> Clone for OutputPort<T> {
    fn clone(&self) -> Self {
        Self {
            port: self.port.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> AsRef<Port> for OutputPort<T> {
    fn as_ref(&self) -> &Port {
        &self.port
    }
}

impl<T> fmt::Debug for OutputPort<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.port.fmt(f)
    }
}

/// Input port consuming values of type `T`
pub struct InputPort<T> {
    port: Port,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Clone + 'static> InputPort<T> {
    pub fn new(name: impl Into<String>, owner: NodeId, ctx: &Context) -> Self {
        Self {
            port: Port::new::<T>(name, PortDirection::Input, owner, ctx),
            _marker: PhantomData,
        }
    }

    /// Current value of the producer, `None` when nothing is connected or
    /// the producer has not published yet
    pub fn get(&self) -> Option<T> {
        self.port.producer().and_then(|producer| producer.load())
    }

    /// Like [`get`](Self::get), but a missing producer is an error
    pub fn try_get(&self) -> Result<Option<T>> {
        match self.port.producer() {
            Some(producer) => Ok(producer.load()),
            None => Err(GraphError::DisconnectedInput(self.port.name().to_string())),
        }
    }

    pub fn port(&self) -> &Port {
        &self.port
    }
}

impl<T> Clone for InputPort<T> {
    fn clone(&self) -> Self {
        Self {
            port: self.port.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> AsRef<Port> for InputPort<T> {
    fn as_ref(&self) -> &Port {
        &self.port
    }
}

impl<T> fmt::Debug for InputPort<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.port.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect;
    use std::cell::Cell;

    #[test]
    fn test_unconnected_input_reads_empty() {
        let ctx = Context::new();
        let input = InputPort::<i32>::new("value", NodeId::next(), &ctx);
        assert_eq!(input.get(), None);
        assert_eq!(
            input.try_get(),
            Err(GraphError::DisconnectedInput("value".into()))
        );
    }

    #[test]
    fn test_input_reads_producer_value() {
        let ctx = Context::new();
        let output = OutputPort::<i32>::new("out", NodeId::next(), &ctx);
        let input = InputPort::<i32>::new("in", NodeId::next(), &ctx);
        connect(&output, &input).unwrap();

        assert_eq!(input.get(), None);
        output.set(7);
        assert_eq!(input.get(), Some(7));
        assert_eq!(input.try_get(), Ok(Some(7)));
        output.clear();
        assert_eq!(input.get(), None);
    }

    #[test]
    fn test_fire_does_not_call_own_subscribers() {
        let ctx = Context::new();
        let owner = NodeId::next();
        let output = OutputPort::<i32>::new("out", owner, &ctx);
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        output
            .port()
            .register_callback(SignalKind::Any, owner, move |_| c.set(c.get() + 1));

        output.port().fire(&mut Signal::modified());
        assert_eq!(calls.get(), 0);
        output.port().deliver(&mut Signal::update());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_misrouted_signal_is_reported() {
        use crate::diagnostics::CollectingSink;

        let sink = Rc::new(CollectingSink::new());
        let ctx = Context::with_sink(sink.clone());
        let output = OutputPort::<i32>::new("out", NodeId::next(), &ctx);
        let input = InputPort::<i32>::new("in", NodeId::next(), &ctx);
        connect(&output, &input).unwrap();

        let reached = Rc::new(Cell::new(false));
        let r = reached.clone();
        input
            .port()
            .register_callback(SignalKind::Any, NodeId::next(), move |_| r.set(true));
        // Update travels backward, an output cannot send it
        output.port().fire(&mut Signal::update());

        assert!(!reached.get());
        assert_eq!(sink.count(DiagnosticKind::MisroutedSignal), 1);
    }

    #[test]
    fn test_slots_are_declared_and_fire() {
        let ctx = Context::new();
        let output = OutputPort::<i32>::new("out", NodeId::next(), &ctx);
        let input = InputPort::<i32>::new("in", NodeId::next(), &ctx);
        connect(&output, &input).unwrap();

        let slot = output.port().register_slot(SignalKind::ContentChanged);
        assert_eq!(output.port().declared_slots(), vec![SignalKind::ContentChanged]);

        let seen = Rc::new(Cell::new(0));
        let s = seen.clone();
        input
            .port()
            .register_callback(SignalKind::ContentChanged, NodeId::next(), move |_| {
                s.set(s.get() + 1)
            });

        slot.fire(&mut Signal::size_changed(crate::geometry::Rect::ZERO));
        // wrong kind for the slot, dropped
        slot.fire(&mut Signal::modified());
        assert_eq!(seen.get(), 1);
    }
}
