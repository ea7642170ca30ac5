//! Nodes and the update/dirty protocol
//!
//! A node owns named input and output ports and a dirty flag. Recomputation
//! is lazy:
//!
//! - a `Modified`-class signal arriving on any input marks the node dirty
//!   and, on the clean → dirty transition only, passes `Modified` on to the
//!   node's consumers;
//! - an `Update` pull arriving on any output is ignored by a clean node. A
//!   dirty node first forwards the pull to its own producers, then clears the
//!   flag, recomputes through [`Process::update_outputs`] and announces the
//!   outcome: `SizeChanged` if its bounds moved, `ContentChanged` otherwise,
//!   nothing if the recompute reports no change.
//!
//! Concrete views implement [`Process`] and call [`install_protocol`] once
//! their ports exist.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::diagnostics::Context;
use crate::error::{GraphError, Result};
use crate::geometry::Rect;
use crate::port::{InputPort, OutputPort, Port, PortDirection};
use crate::signal::{Signal, SignalKind};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a node instance
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Allocate a fresh id
    pub fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Recompute state of a node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum NodeState {
    #[default]
    Clean,
    Dirty,
}

/// Outcome of a recompute
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Change {
    /// Output is the same as before
    None,
    /// Output changed but its bounds did not
    Content,
    /// Output bounds are now the given rect
    Size(Rect),
}

impl Change {
    /// Classify a recompute by comparing bounds
    pub fn between(old: Rect, new: Rect) -> Change {
        if old == new {
            Change::Content
        } else {
            Change::Size(new)
        }
    }

    fn signal(self) -> Option<Signal> {
        match self {
            Change::None => None,
            Change::Content => Some(Signal::content_changed()),
            Change::Size(rect) => Some(Signal::size_changed(rect)),
        }
    }
}

/// Counters describing how often a node did work
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NodeStats {
    /// `Update` pulls received
    pub pulls: u64,
    /// Pulls that led to a recompute
    pub recomputes: u64,
    /// Clean → dirty transitions
    pub invalidations: u64,
}

#[derive(Default)]
struct PortTable {
    order: SmallVec<[Port; 4]>,
    by_name: FxHashMap<String, usize>,
}

impl PortTable {
    fn insert(&mut self, port: Port) {
        match self.by_name.get(port.name()) {
            Some(&index) => self.order[index] = port,
            None => {
                self.by_name.insert(port.name().to_string(), self.order.len());
                self.order.push(port);
            }
        }
    }

    fn get(&self, name: &str) -> Option<&Port> {
        self.by_name.get(name).map(|&index| &self.order[index])
    }
}

/// Ports, dirty flag and statistics shared by every node
pub struct NodeCore {
    id: NodeId,
    name: String,
    ctx: Context,
    inputs: RefCell<PortTable>,
    outputs: RefCell<PortTable>,
    /// Ports of inner nodes re-exposed as this node's outputs
    exports: RefCell<PortTable>,
    state: Cell<NodeState>,
    stats: Cell<NodeStats>,
}

impl NodeCore {
    pub fn new(name: impl Into<String>, ctx: &Context) -> Self {
        Self {
            id: NodeId::next(),
            name: name.into(),
            ctx: ctx.clone(),
            inputs: RefCell::default(),
            outputs: RefCell::default(),
            exports: RefCell::default(),
            state: Cell::new(NodeState::Clean),
            stats: Cell::new(NodeStats::default()),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    // =========================================================================
    // Ports
    // =========================================================================

    pub fn add_input<T: Clone + 'static>(&self, name: &str) -> InputPort<T> {
        let port = InputPort::new(name, self.id, &self.ctx);
        self.inputs.borrow_mut().insert(port.port().clone());
        port
    }

    pub fn add_output<T: Clone + 'static>(&self, name: &str) -> OutputPort<T> {
        let port = OutputPort::new(name, self.id, &self.ctx);
        self.outputs.borrow_mut().insert(port.port().clone());
        port
    }

    /// Re-expose an inner node's output under this node
    pub fn export_output(&self, port: Port) {
        self.exports.borrow_mut().insert(port);
    }

    pub fn input(&self, name: &str) -> Result<Port> {
        self.inputs
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| self.not_found(name, PortDirection::Input))
    }

    pub fn output(&self, name: &str) -> Result<Port> {
        let own = self.outputs.borrow().get(name).cloned();
        own.or_else(|| self.exports.borrow().get(name).cloned())
            .ok_or_else(|| self.not_found(name, PortDirection::Output))
    }

    fn not_found(&self, name: &str, direction: PortDirection) -> GraphError {
        GraphError::PortNotFound {
            node: self.name.clone(),
            name: name.to_string(),
            direction,
        }
    }

    /// Snapshot of the inputs, in creation order
    pub fn inputs(&self) -> SmallVec<[Port; 4]> {
        self.inputs.borrow().order.clone()
    }

    /// Outputs owned by this node, exports excluded
    pub fn outputs(&self) -> SmallVec<[Port; 4]> {
        self.outputs.borrow().order.clone()
    }

    pub fn exported_outputs(&self) -> SmallVec<[Port; 4]> {
        self.exports.borrow().order.clone()
    }

    // =========================================================================
    // Protocol state
    // =========================================================================

    pub fn state(&self) -> NodeState {
        self.state.get()
    }

    pub fn is_dirty(&self) -> bool {
        self.state.get() == NodeState::Dirty
    }

    /// Mark the node dirty, telling consumers on the clean → dirty edge
    pub fn set_dirty(&self) {
        if self.state.get() == NodeState::Dirty {
            return;
        }
        self.state.set(NodeState::Dirty);
        self.bump(|s| s.invalidations += 1);
        tracing::trace!(target: "pipeview::node", node = %self.name, "dirty");
        for output in self.outputs() {
            output.fire(&mut Signal::modified());
        }
    }

    pub fn stats(&self) -> NodeStats {
        self.stats.get()
    }

    fn bump(&self, f: impl FnOnce(&mut NodeStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }
}

impl Drop for NodeCore {
    fn drop(&mut self) {
        let inputs = &self.inputs.get_mut().order;
        for port in inputs.iter() {
            port.detach();
        }
        for port in self.outputs.get_mut().order.iter() {
            port.detach();
        }
    }
}

impl fmt::Debug for NodeCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeCore")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state.get())
            .field("inputs", &self.inputs.borrow().order.len())
            .field("outputs", &self.outputs.borrow().order.len())
            .finish()
    }
}

/// A node that derives its outputs from its inputs
pub trait Process {
    fn core(&self) -> &NodeCore;

    /// Recompute every output from the current inputs
    ///
    /// Called with the dirty flag already cleared. Must only touch the node's
    /// own cached outputs.
    fn update_outputs(&self) -> Change;
}

/// Handle a pull on a node
///
/// Returns the change that was announced, or `None` when the node was clean.
pub fn pull<P: Process + ?Sized>(node: &P) -> Option<Change> {
    let core = node.core();
    core.bump(|s| s.pulls += 1);
    if !core.is_dirty() {
        return None;
    }

    for input in core.inputs() {
        input.fire(&mut Signal::update());
    }
    core.state.set(NodeState::Clean);
    let change = node.update_outputs();
    core.bump(|s| s.recomputes += 1);
    tracing::trace!(target: "pipeview::node", node = %core.name, ?change, "recomputed");

    if let Some(signal) = change.signal() {
        for output in core.outputs() {
            output.fire(&mut signal.clone());
        }
    }
    Some(change)
}

/// Mark `node` dirty whenever `input` receives a `Modified`-class signal
pub fn watch_input<P: Process + 'static>(node: &Rc<P>, input: &Port) {
    let weak: Weak<P> = Rc::downgrade(node);
    input.register_callback(SignalKind::Modified, node.core().id(), move |_| {
        if let Some(node) = weak.upgrade() {
            node.core().set_dirty();
        }
    });
}

/// Serve `Update` pulls arriving at `output`
pub fn serve_output<P: Process + 'static>(node: &Rc<P>, output: &Port) {
    let weak: Weak<P> = Rc::downgrade(node);
    output.register_callback(SignalKind::Update, node.core().id(), move |_| {
        if let Some(node) = weak.upgrade() {
            pull(&*node);
        }
    });
}

/// Wire the update/dirty protocol onto every port `node` currently owns
pub fn install_protocol<P: Process + 'static>(node: &Rc<P>) {
    let core = node.core();
    for input in core.inputs() {
        watch_input(node, &input);
    }
    for output in core.outputs() {
        serve_output(node, &output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect;
    use std::cell::RefCell;

    /// Outputs a rect whose width comes from an input
    struct Stretch {
        core: NodeCore,
        width: InputPort<f64>,
        bounds: OutputPort<Rect>,
    }

    impl Stretch {
        fn new(ctx: &Context) -> Rc<Self> {
            let core = NodeCore::new("stretch", ctx);
            let width = core.add_input("width");
            let bounds = core.add_output("bounds");
            bounds.set(Rect::ZERO);
            let node = Rc::new(Self {
                core,
                width,
                bounds,
            });
            install_protocol(&node);
            node
        }
    }

    impl Process for Stretch {
        fn core(&self) -> &NodeCore {
            &self.core
        }

        fn update_outputs(&self) -> Change {
            let old = self.bounds.value().unwrap_or(Rect::ZERO);
            let new = Rect::new(0.0, 0.0, self.width.get().unwrap_or(0.0), 1.0);
            self.bounds.set(new);
            Change::between(old, new)
        }
    }

    struct Consumer {
        input: InputPort<Rect>,
        log: Rc<RefCell<Vec<SignalKind>>>,
    }

    fn consumer(ctx: &Context, producer: &OutputPort<Rect>) -> Consumer {
        let input = InputPort::new("in", NodeId::next(), ctx);
        let log = Rc::new(RefCell::new(Vec::new()));
        connect(producer, &input).unwrap();
        {
            let log = log.clone();
            input
                .port()
                .register_callback(SignalKind::Modified, NodeId::next(), move |s| {
                    if s.kind() == SignalKind::Modified {
                        log.borrow_mut().push(SignalKind::Modified);
                    }
                });
        }
        for kind in [SignalKind::ContentChanged, SignalKind::SizeChanged] {
            let log = log.clone();
            input
                .port()
                .register_callback(kind, NodeId::next(), move |_| log.borrow_mut().push(kind));
        }
        Consumer { input, log }
    }

    fn source(ctx: &Context, value: f64) -> OutputPort<f64> {
        let out = OutputPort::new("value", NodeId::next(), ctx);
        out.set(value);
        out
    }

    #[test]
    fn test_connecting_marks_dirty_and_pull_cleans() {
        let ctx = Context::new();
        let node = Stretch::new(&ctx);
        assert_eq!(node.core().state(), NodeState::Clean);

        let width = source(&ctx, 10.0);
        connect(&width, &node.width).unwrap();
        assert_eq!(node.core().state(), NodeState::Dirty);

        let sink = consumer(&ctx, &node.bounds);
        sink.input.port().fire(&mut Signal::update());
        assert_eq!(node.core().state(), NodeState::Clean);
        assert_eq!(node.bounds.value(), Some(Rect::new(0.0, 0.0, 10.0, 1.0)));
    }

    #[test]
    fn test_pull_twice_is_idempotent() {
        let ctx = Context::new();
        let node = Stretch::new(&ctx);
        let width = source(&ctx, 4.0);
        connect(&width, &node.width).unwrap();
        let sink = consumer(&ctx, &node.bounds);

        sink.input.port().fire(&mut Signal::update());
        let first = node.bounds.value();
        sink.log.borrow_mut().clear();

        sink.input.port().fire(&mut Signal::update());
        assert_eq!(node.bounds.value(), first);
        assert!(sink.log.borrow().is_empty());
        assert_eq!(node.core().stats().recomputes, 1);
        assert_eq!(node.core().stats().pulls, 2);
    }

    #[test]
    fn test_size_change_fires_once_and_reaches_content_subscribers() {
        let ctx = Context::new();
        let node = Stretch::new(&ctx);
        let width = source(&ctx, 3.0);
        connect(&width, &node.width).unwrap();
        let sink = consumer(&ctx, &node.bounds);

        sink.input.port().fire(&mut Signal::update());
        let log = sink.log.borrow().clone();
        assert_eq!(
            log,
            vec![SignalKind::ContentChanged, SignalKind::SizeChanged]
        );
    }

    #[test]
    fn test_same_bounds_reports_content_only() {
        let ctx = Context::new();
        let node = Stretch::new(&ctx);
        let width = source(&ctx, 3.0);
        connect(&width, &node.width).unwrap();
        let sink = consumer(&ctx, &node.bounds);
        sink.input.port().fire(&mut Signal::update());
        sink.log.borrow_mut().clear();

        // producer announces a change that does not move the bounds
        width.port().fire(&mut Signal::content_changed());
        assert_eq!(*sink.log.borrow(), vec![SignalKind::Modified]);
        sink.input.port().fire(&mut Signal::update());
        assert_eq!(
            *sink.log.borrow(),
            vec![SignalKind::Modified, SignalKind::ContentChanged]
        );
    }

    #[test]
    fn test_modified_is_forwarded_once_while_dirty() {
        let ctx = Context::new();
        let node = Stretch::new(&ctx);
        let width = source(&ctx, 1.0);
        let sink = consumer(&ctx, &node.bounds);
        connect(&width, &node.width).unwrap();

        width.port().fire(&mut Signal::content_changed());
        width.port().fire(&mut Signal::size_changed(Rect::ZERO));
        assert_eq!(*sink.log.borrow(), vec![SignalKind::Modified]);
        assert_eq!(node.core().stats().invalidations, 1);
    }

    #[test]
    fn test_clean_node_does_not_forward_pull() {
        let ctx = Context::new();
        let node = Stretch::new(&ctx);
        let width = source(&ctx, 1.0);
        connect(&width, &node.width).unwrap();
        let pulls = Rc::new(Cell::new(0));
        let p = pulls.clone();
        width
            .port()
            .register_callback(SignalKind::Update, NodeId::next(), move |_| p.set(p.get() + 1));
        let sink = consumer(&ctx, &node.bounds);

        sink.input.port().fire(&mut Signal::update());
        sink.input.port().fire(&mut Signal::update());
        assert_eq!(pulls.get(), 1);
    }

    #[test]
    fn test_disconnected_recompute_yields_empty_output() {
        let ctx = Context::new();
        let node = Stretch::new(&ctx);
        let width = source(&ctx, 8.0);
        let link = connect(&width, &node.width).unwrap();
        let sink = consumer(&ctx, &node.bounds);
        sink.input.port().fire(&mut Signal::update());

        link.disconnect();
        assert!(node.core().is_dirty());
        sink.input.port().fire(&mut Signal::update());
        assert_eq!(node.bounds.value(), Some(Rect::new(0.0, 0.0, 0.0, 1.0)));
    }

    #[test]
    fn test_port_lookup() {
        let ctx = Context::new();
        let node = Stretch::new(&ctx);
        assert!(node.core().input("width").is_ok());
        assert!(node.core().output("bounds").is_ok());
        assert_eq!(
            node.core().output("width").unwrap_err(),
            GraphError::PortNotFound {
                node: "stretch".into(),
                name: "width".into(),
                direction: PortDirection::Output,
            }
        );
    }

    #[test]
    fn test_dropping_node_unlinks_consumers() {
        let ctx = Context::new();
        let node = Stretch::new(&ctx);
        let sink = consumer(&ctx, &node.bounds);
        assert!(sink.input.port().is_connected());
        drop(node);
        assert!(!sink.input.port().is_connected());
        assert_eq!(*sink.log.borrow(), vec![SignalKind::Modified]);
    }
}
