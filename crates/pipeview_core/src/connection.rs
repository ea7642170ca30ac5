//! Connections between an output port and an input port
//!
//! A connection is the directed edge output → input. It is the channel for
//! every signal crossing between the two nodes and the attachment point for
//! [`SignalFilter`]s, one chain per direction.
//!
//! # Example
//!
//! ```rust,ignore
//! let link = connect(child.core().output("painter")?, &container_input)?;
//! link.attach_filter(Direction::Backward, OffsetFilter::new(Point::new(10.0, 0.0)))?;
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::{GraphError, Result};
use crate::filter::{FilterVerdict, FilteredSignal, SignalFilter};
use crate::port::{Port, PortDirection, PortInner};
use crate::signal::{Direction, Signal};

type FilterChain = SmallVec<[Rc<dyn SignalFilter>; 2]>;

/// Edge state, owned by the consumer's input port
pub(crate) struct Edge {
    source: Weak<PortInner>,
    target: Weak<PortInner>,
    forward: RefCell<FilterChain>,
    backward: RefCell<FilterChain>,
}

impl Edge {
    pub(crate) fn source(&self) -> Option<Rc<PortInner>> {
        self.source.upgrade()
    }

    pub(crate) fn target(&self) -> Option<Rc<PortInner>> {
        self.target.upgrade()
    }

    fn chain(&self, direction: Direction) -> &RefCell<FilterChain> {
        match direction {
            Direction::Forward => &self.forward,
            Direction::Backward => &self.backward,
        }
    }

    /// Carry `signal` across this edge
    ///
    /// The far end receives a copy that went through the filter chain of
    /// `direction` in attachment order. Only the `processed` flag flows back
    /// into `signal`; payload rewrites stay on this edge.
    pub(crate) fn carry(&self, direction: Direction, signal: &mut Signal) {
        let (near, far) = match direction {
            Direction::Forward => (self.source.upgrade(), self.target.upgrade()),
            Direction::Backward => (self.target.upgrade(), self.source.upgrade()),
        };
        let Some(far) = far else {
            return;
        };

        let filters = self.chain(direction).borrow().clone();
        let mut copy = signal.clone();
        for filter in filters {
            let mut scratch = FilteredSignal::new(copy.clone());
            match filter.filter(&mut scratch) {
                Ok(FilterVerdict::Forward) => copy = scratch.into_signal(),
                Ok(FilterVerdict::Swallow) => {
                    tracing::trace!(
                        target: "pipeview::connection",
                        kind = ?signal.kind(),
                        ?direction,
                        "signal swallowed by filter"
                    );
                    if scratch.processed() {
                        signal.mark_processed();
                    }
                    return;
                }
                Err(fault) => {
                    // the scratch copy is discarded, the signal moves on as it was
                    let source = near
                        .as_ref()
                        .map(|port| port.name().to_string())
                        .unwrap_or_default();
                    tracing::warn!(
                        target: "pipeview::connection",
                        port = %source,
                        kind = ?signal.kind(),
                        "{fault}, passing signal through unchanged"
                    );
                    far.context().report(Diagnostic::new(
                        DiagnosticKind::FilterFault,
                        source,
                        fault.to_string(),
                    ));
                }
            }
        }

        far.deliver(&mut copy);
        if copy.processed() {
            signal.mark_processed();
        }
    }
}

/// Wire `output` to `input`
///
/// Fails with [`GraphError::DirectionMismatch`] if the ports are on the wrong
/// sides and with [`GraphError::TypeMismatch`] if they carry different value
/// types. Any previous producer of `input` is released first, together with
/// its filters. Once the edge is in place the input's subscribers receive
/// `InputSet` and then the output's subscribers receive `InputAdded`.
pub fn connect(output: impl AsRef<Port>, input: impl AsRef<Port>) -> Result<Connection> {
    let output = output.as_ref();
    let input = input.as_ref();

    if output.direction() != PortDirection::Output {
        return Err(GraphError::DirectionMismatch {
            port: output.name().to_string(),
            expected: PortDirection::Output,
        });
    }
    if input.direction() != PortDirection::Input {
        return Err(GraphError::DirectionMismatch {
            port: input.name().to_string(),
            expected: PortDirection::Input,
        });
    }
    if output.value_type() != input.value_type() {
        return Err(GraphError::TypeMismatch {
            output: output.name().to_string(),
            input: input.name().to_string(),
            expected: input.value_type().name(),
            found: output.value_type().name(),
        });
    }

    let edge = Rc::new(Edge {
        source: Rc::downgrade(output.inner()),
        target: Rc::downgrade(input.inner()),
        forward: RefCell::new(SmallVec::new()),
        backward: RefCell::new(SmallVec::new()),
    });

    if let Some(previous) = input.inner().replace_producer(Some(edge.clone())) {
        if let Some(source) = previous.source() {
            source.remove_consumer(&previous);
        }
        tracing::debug!(
            target: "pipeview::connection",
            input = %input.name(),
            "replaced previous producer"
        );
    }
    output.inner().add_consumer(&edge);

    tracing::debug!(
        target: "pipeview::connection",
        output = %output.name(),
        input = %input.name(),
        "connected"
    );

    edge.carry(Direction::Forward, &mut Signal::new(crate::signal::Payload::InputSet));
    edge.carry(Direction::Backward, &mut Signal::new(crate::signal::Payload::InputAdded));

    Ok(Connection::from_edge(&edge))
}

/// Handle to a connection
///
/// Does not keep the connection alive: the consumer's input owns it. A
/// handle to a released connection reports [`GraphError::ConnectionReleased`].
#[derive(Clone)]
pub struct Connection {
    edge: Weak<Edge>,
}

impl Connection {
    pub(crate) fn from_edge(edge: &Rc<Edge>) -> Self {
        Self {
            edge: Rc::downgrade(edge),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.edge.strong_count() > 0
    }

    /// Producer side of the connection
    pub fn source(&self) -> Option<Port> {
        self.edge
            .upgrade()?
            .source()
            .map(Port::from_inner)
    }

    /// Consumer side of the connection
    pub fn target(&self) -> Option<Port> {
        self.edge
            .upgrade()?
            .target()
            .map(Port::from_inner)
    }

    /// Append `filter` to the chain for signals travelling in `direction`
    ///
    /// Filters run in attachment order: the first attached sees the signal
    /// first.
    pub fn attach_filter(&self, direction: Direction, filter: impl SignalFilter + 'static) -> Result<()> {
        self.attach_shared(direction, Rc::new(filter))
    }

    /// Like [`attach_filter`](Self::attach_filter) for a filter that is
    /// shared with other connections
    pub fn attach_shared(&self, direction: Direction, filter: Rc<dyn SignalFilter>) -> Result<()> {
        let edge = self.edge.upgrade().ok_or(GraphError::ConnectionReleased)?;
        edge.chain(direction).borrow_mut().push(filter);
        Ok(())
    }

    pub fn filter_count(&self, direction: Direction) -> usize {
        self.edge
            .upgrade()
            .map(|edge| edge.chain(direction).borrow().len())
            .unwrap_or(0)
    }

    /// Drop every filter of `direction`
    pub fn clear_filters(&self, direction: Direction) -> Result<()> {
        let edge = self.edge.upgrade().ok_or(GraphError::ConnectionReleased)?;
        edge.chain(direction).borrow_mut().clear();
        Ok(())
    }

    /// Release the connection and its filters
    ///
    /// The former consumer receives `Modified` so it can re-derive its output
    /// without a producer. Returns false if the connection was already gone.
    pub fn disconnect(&self) -> bool {
        let Some(edge) = self.edge.upgrade() else {
            return false;
        };
        if let Some(source) = edge.source() {
            source.remove_consumer(&edge);
        }
        let target = edge.target();
        if let Some(target) = &target {
            target.release_producer(&edge);
        }
        drop(edge);

        if let Some(target) = target {
            tracing::debug!(
                target: "pipeview::connection",
                input = %target.name(),
                "disconnected"
            );
            target.deliver(&mut Signal::modified());
        }
        true
    }

    pub fn ptr_eq(&self, other: &Connection) -> bool {
        Weak::ptr_eq(&self.edge, &other.edge)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("source", &self.source().map(|p| p.name().to_string()))
            .field("target", &self.target().map(|p| p.name().to_string()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{CollectingSink, Context};
    use crate::error::FilterFault;
    use crate::filter::filter_fn;
    use crate::geometry::Point;
    use crate::input::{ButtonsHeld, Modifiers};
    use crate::node::NodeId;
    use crate::port::{InputPort, OutputPort};
    use crate::signal::SignalKind;
    use std::cell::{Cell, RefCell};

    fn pair(ctx: &Context) -> (OutputPort<i32>, InputPort<i32>) {
        (
            OutputPort::new("out", NodeId::next(), ctx),
            InputPort::new("in", NodeId::next(), ctx),
        )
    }

    fn log_kinds(port: &Port, log: &Rc<RefCell<Vec<SignalKind>>>) {
        let log = log.clone();
        port.register_callback(SignalKind::Any, NodeId::next(), move |s| {
            log.borrow_mut().push(s.kind())
        });
    }

    #[test]
    fn test_type_mismatch_is_rejected() {
        let ctx = Context::new();
        let output = OutputPort::<i32>::new("count", NodeId::next(), &ctx);
        let input = InputPort::<String>::new("label", NodeId::next(), &ctx);

        let err = connect(&output, &input).unwrap_err();
        assert!(matches!(err, GraphError::TypeMismatch { .. }));
        assert!(!input.port().is_connected());
        assert_eq!(output.port().connection_count(), 0);
    }

    #[test]
    fn test_direction_mismatch_is_rejected() {
        let ctx = Context::new();
        let (output, input) = pair(&ctx);
        let err = connect(&input, &output).unwrap_err();
        assert!(matches!(
            err,
            GraphError::DirectionMismatch {
                expected: PortDirection::Output,
                ..
            }
        ));
    }

    #[test]
    fn test_connect_notifies_both_ends() {
        let ctx = Context::new();
        let (output, input) = pair(&ctx);
        let consumer_log = Rc::new(RefCell::new(Vec::new()));
        let producer_log = Rc::new(RefCell::new(Vec::new()));
        log_kinds(input.port(), &consumer_log);
        log_kinds(output.port(), &producer_log);

        connect(&output, &input).unwrap();
        assert_eq!(*consumer_log.borrow(), vec![SignalKind::InputSet]);
        assert_eq!(*producer_log.borrow(), vec![SignalKind::InputAdded]);
    }

    #[test]
    fn test_input_has_single_producer() {
        let ctx = Context::new();
        let first = OutputPort::<i32>::new("first", NodeId::next(), &ctx);
        let second = OutputPort::<i32>::new("second", NodeId::next(), &ctx);
        let input = InputPort::<i32>::new("in", NodeId::next(), &ctx);
        first.set(1);
        second.set(2);

        let old = connect(&first, &input).unwrap();
        connect(&second, &input).unwrap();
        connect(&first, &input).unwrap();
        connect(&second, &input).unwrap();

        assert!(!old.is_alive());
        assert_eq!(input.port().connection_count(), 1);
        assert_eq!(first.port().connection_count(), 0);
        assert_eq!(second.port().connection_count(), 1);
        assert_eq!(input.get(), Some(2));
    }

    #[test]
    fn test_fan_out() {
        let ctx = Context::new();
        let output = OutputPort::<i32>::new("out", NodeId::next(), &ctx);
        let a = InputPort::<i32>::new("a", NodeId::next(), &ctx);
        let b = InputPort::<i32>::new("b", NodeId::next(), &ctx);
        connect(&output, &a).unwrap();
        connect(&output, &b).unwrap();

        let hits = Rc::new(Cell::new(0));
        for input in [&a, &b] {
            let hits = hits.clone();
            input
                .port()
                .register_callback(SignalKind::Modified, NodeId::next(), move |_| {
                    hits.set(hits.get() + 1)
                });
        }
        output.port().fire(&mut Signal::content_changed());
        assert_eq!(hits.get(), 2);
        assert_eq!(output.port().consumers().len(), 2);
    }

    #[test]
    fn test_disconnect_sends_modified_and_releases_filters() {
        let ctx = Context::new();
        let (output, input) = pair(&ctx);
        output.set(5);
        let link = connect(&output, &input).unwrap();
        link.attach_filter(Direction::Forward, filter_fn(|_| Ok(FilterVerdict::Forward)))
            .unwrap();

        let log = Rc::new(RefCell::new(Vec::new()));
        log_kinds(input.port(), &log);

        assert!(link.disconnect());
        assert!(!link.disconnect());
        assert_eq!(*log.borrow(), vec![SignalKind::Modified]);
        assert_eq!(input.get(), None);
        assert_eq!(link.filter_count(Direction::Forward), 0);
        assert_eq!(
            link.attach_filter(Direction::Forward, filter_fn(|_| Ok(FilterVerdict::Forward))),
            Err(GraphError::ConnectionReleased)
        );
    }

    #[test]
    fn test_dropping_input_releases_connection() {
        let ctx = Context::new();
        let output = OutputPort::<i32>::new("out", NodeId::next(), &ctx);
        let link = {
            let input = InputPort::<i32>::new("in", NodeId::next(), &ctx);
            connect(&output, &input).unwrap()
        };
        assert!(!link.is_alive());
        assert_eq!(output.port().connection_count(), 0);
    }

    #[test]
    fn test_backward_filters_run_in_attachment_order() {
        let ctx = Context::new();
        let (output, input) = pair(&ctx);
        let link = connect(&output, &input).unwrap();

        // F1 doubles, F2 adds one: F1 first gives 2x+1
        link.attach_filter(Direction::Backward, filter_fn(|s| {
            s.map_position(|p| Ok(p * 2.0))?;
            Ok(FilterVerdict::Forward)
        }))
        .unwrap();
        link.attach_filter(Direction::Backward, filter_fn(|s| {
            s.map_position(|p| Ok(p + Point::new(1.0, 1.0)))?;
            Ok(FilterVerdict::Forward)
        }))
        .unwrap();

        let seen = Rc::new(Cell::new(None));
        let s = seen.clone();
        output
            .port()
            .register_callback(SignalKind::Pointer, NodeId::next(), move |sig| {
                s.set(sig.position())
            });

        let mut signal = Signal::mouse_move(Point::new(3.0, 4.0), ButtonsHeld::NONE, Modifiers::NONE);
        input.port().fire(&mut signal);
        assert_eq!(seen.get(), Some(Point::new(7.0, 9.0)));
        // the firer's payload is untouched
        assert_eq!(signal.position(), Some(Point::new(3.0, 4.0)));
    }

    #[test]
    fn test_processed_flag_flows_back() {
        let ctx = Context::new();
        let (output, input) = pair(&ctx);
        connect(&output, &input).unwrap();
        output
            .port()
            .register_callback(SignalKind::KeyDown, NodeId::next(), |s| s.mark_processed());

        let mut signal = Signal::key_down(crate::input::Key::R, Modifiers::NONE);
        input.port().fire(&mut signal);
        assert!(signal.processed());
    }

    #[test]
    fn test_filter_fault_passes_signal_through() {
        let sink = Rc::new(CollectingSink::new());
        let ctx = Context::with_sink(sink.clone());
        let (output, input) = pair(&ctx);
        let link = connect(&output, &input).unwrap();

        link.attach_filter(Direction::Backward, filter_fn(|s| {
            s.map_position(|p| Ok(p * 100.0))?;
            Err(FilterFault::new("singular transform"))
        }))
        .unwrap();

        let seen = Rc::new(Cell::new(None));
        let s = seen.clone();
        output
            .port()
            .register_callback(SignalKind::MouseMove, NodeId::next(), move |sig| {
                s.set(sig.position())
            });

        input.port().fire(&mut Signal::mouse_move(
            Point::new(1.0, 2.0),
            ButtonsHeld::NONE,
            Modifiers::NONE,
        ));
        assert_eq!(seen.get(), Some(Point::new(1.0, 2.0)));
        assert_eq!(sink.count(DiagnosticKind::FilterFault), 1);
    }

    #[test]
    fn test_swallowing_filter_stops_delivery() {
        let ctx = Context::new();
        let (output, input) = pair(&ctx);
        let link = connect(&output, &input).unwrap();
        link.attach_filter(Direction::Forward, filter_fn(|s| {
            s.mark_processed();
            Ok(FilterVerdict::Swallow)
        }))
        .unwrap();

        let reached = Rc::new(Cell::new(false));
        let r = reached.clone();
        input
            .port()
            .register_callback(SignalKind::Any, NodeId::next(), move |_| r.set(true));

        let mut signal = Signal::content_changed();
        output.port().fire(&mut signal);
        assert!(!reached.get());
        assert!(signal.processed());
    }

    #[test]
    fn test_reentrant_fire_completes_depth_first() {
        let ctx = Context::new();
        let (a_out, b_in) = pair(&ctx);
        let b_out = OutputPort::<i32>::new("b_out", NodeId::next(), &ctx);
        let c_in = InputPort::<i32>::new("c_in", NodeId::next(), &ctx);
        connect(&a_out, &b_in).unwrap();
        connect(&b_out, &c_in).unwrap();

        let order = Rc::new(RefCell::new(Vec::new()));
        {
            let order = order.clone();
            let relay = b_out.clone();
            b_in.port()
                .register_callback(SignalKind::ContentChanged, NodeId::next(), move |_| {
                    order.borrow_mut().push("b enter");
                    relay.port().fire(&mut Signal::content_changed());
                    order.borrow_mut().push("b leave");
                });
        }
        {
            let order = order.clone();
            c_in.port()
                .register_callback(SignalKind::ContentChanged, NodeId::next(), move |_| {
                    order.borrow_mut().push("c")
                });
        }

        a_out.port().fire(&mut Signal::content_changed());
        order.borrow_mut().push("after fire");
        assert_eq!(*order.borrow(), vec!["b enter", "c", "b leave", "after fire"]);
    }
}
