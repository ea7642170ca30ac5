//! Per-port subscriber registries
//!
//! Every port owns a [`Slots`] table. Handlers are registered for a
//! [`SignalKind`] and run in subscription order for every delivered signal
//! whose kind descends from it.
//!
//! Delivery never holds a borrow of the table while a handler runs: the
//! matching handlers are cloned out first. A handler may therefore fire
//! further signals, subscribe or unsubscribe without tripping a `RefCell`,
//! and the whole cascade completes depth-first before the fire returns.

use std::rc::{Rc, Weak};

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

use crate::node::NodeId;
use crate::port::PortInner;
use crate::signal::{Signal, SignalKind};

new_key_type! {
    /// Handle of a registered callback, unique within its port
    pub struct SubscriptionId;
}

/// A signal handler
///
/// Shared (`Rc`) rather than boxed so delivery can clone the handler list
/// and release the table before calling out.
pub type SignalHandler = Rc<dyn Fn(&mut Signal)>;

struct Subscriber {
    kind: SignalKind,
    owner: NodeId,
    handler: SignalHandler,
}

/// Subscribers and declared emission points of one port
#[derive(Default)]
pub struct Slots {
    subscribers: SlotMap<SubscriptionId, Subscriber>,
    /// Subscription order (SlotMap iteration order is not insertion order)
    order: SmallVec<[SubscriptionId; 4]>,
    /// Kinds this port was declared to emit
    declared: SmallVec<[SignalKind; 4]>,
}

impl Slots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind` and all its descendants
    pub fn subscribe(&mut self, kind: SignalKind, owner: NodeId, handler: SignalHandler) -> SubscriptionId {
        let id = self.subscribers.insert(Subscriber {
            kind,
            owner,
            handler,
        });
        self.order.push(id);
        id
    }

    /// Remove one subscription, returns false if it was already gone
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        if self.subscribers.remove(id).is_some() {
            self.order.retain(|s| *s != id);
            true
        } else {
            false
        }
    }

    /// Remove every subscription made on behalf of `owner`
    pub fn unsubscribe_owner(&mut self, owner: NodeId) -> usize {
        let before = self.subscribers.len();
        self.subscribers.retain(|_, s| s.owner != owner);
        let subscribers = &self.subscribers;
        self.order.retain(|id| subscribers.contains_key(*id));
        before - self.subscribers.len()
    }

    /// Handlers that accept `kind`, in subscription order
    pub fn matching(&self, kind: SignalKind) -> SmallVec<[SignalHandler; 4]> {
        self.order
            .iter()
            .filter_map(|id| self.subscribers.get(*id))
            .filter(|s| kind.is_a(s.kind))
            .map(|s| s.handler.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn declare(&mut self, kind: SignalKind) {
        if !self.declared.contains(&kind) {
            self.declared.push(kind);
        }
    }

    pub fn declared(&self) -> &[SignalKind] {
        &self.declared
    }
}

/// Run handlers one after another on the same signal
pub(crate) fn run_handlers(handlers: &[SignalHandler], signal: &mut Signal) {
    for handler in handlers {
        handler(signal);
    }
}

/// A named emission point on a port
///
/// Obtained from [`Port::register_slot`](crate::port::Port::register_slot).
/// Firing a slot sends the signal across every connection of its port in
/// the port's natural direction: forward from outputs, backward from inputs.
#[derive(Clone)]
pub struct Slot {
    kind: SignalKind,
    port: Weak<PortInner>,
}

impl Slot {
    pub(crate) fn new(kind: SignalKind, port: Weak<PortInner>) -> Self {
        Self { kind, port }
    }

    pub fn kind(&self) -> SignalKind {
        self.kind
    }

    /// Fire `signal` to all current subscribers across the port's connections
    ///
    /// The signal must belong to the slot's kind; anything else is dropped
    /// with a warning. Returns once the whole cascade has completed.
    pub fn fire(&self, signal: &mut Signal) {
        if !signal.kind().is_a(self.kind) {
            tracing::warn!(
                target: "pipeview::slots",
                slot = ?self.kind,
                signal = ?signal.kind(),
                "signal does not match slot kind, dropped"
            );
            return;
        }
        match self.port.upgrade() {
            Some(inner) => PortInner::fire(&inner, signal),
            None => tracing::trace!(target: "pipeview::slots", "slot outlived its port"),
        }
    }

    /// Convenience: fire a fresh signal and report whether anyone claimed it
    pub fn emit(&self, signal: Signal) -> bool {
        let mut signal = signal;
        self.fire(&mut signal);
        signal.processed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn recorder(log: &Rc<RefCell<Vec<&'static str>>>, tag: &'static str) -> SignalHandler {
        let log = log.clone();
        Rc::new(move |_signal: &mut Signal| log.borrow_mut().push(tag))
    }

    #[test]
    fn test_subscription_order_is_preserved() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut slots = Slots::new();
        let owner = NodeId::next();

        let first = slots.subscribe(SignalKind::ContentChanged, owner, recorder(&log, "a"));
        slots.subscribe(SignalKind::ContentChanged, owner, recorder(&log, "b"));
        // reuse of the freed slot must not move the new handler forward
        slots.unsubscribe(first);
        slots.subscribe(SignalKind::ContentChanged, owner, recorder(&log, "c"));

        let mut signal = Signal::content_changed();
        run_handlers(&slots.matching(signal.kind()), &mut signal);
        assert_eq!(*log.borrow(), vec!["b", "c"]);
    }

    #[test]
    fn test_matching_includes_subtypes() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut slots = Slots::new();
        let owner = NodeId::next();
        slots.subscribe(SignalKind::ContentChanged, owner, recorder(&log, "content"));
        slots.subscribe(SignalKind::SizeChanged, owner, recorder(&log, "size"));

        assert_eq!(slots.matching(SignalKind::SizeChanged).len(), 2);
        assert_eq!(slots.matching(SignalKind::ContentChanged).len(), 1);
        assert_eq!(slots.matching(SignalKind::Update).len(), 0);
    }

    #[test]
    fn test_unsubscribe_owner() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut slots = Slots::new();
        let a = NodeId::next();
        let b = NodeId::next();
        slots.subscribe(SignalKind::Any, a, recorder(&log, "a1"));
        slots.subscribe(SignalKind::Any, b, recorder(&log, "b"));
        slots.subscribe(SignalKind::Any, a, recorder(&log, "a2"));

        assert_eq!(slots.unsubscribe_owner(a), 2);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots.matching(SignalKind::Update).len(), 1);
    }

    #[test]
    fn test_declared_kinds_are_deduplicated() {
        let mut slots = Slots::new();
        slots.declare(SignalKind::SizeChanged);
        slots.declare(SignalKind::SizeChanged);
        slots.declare(SignalKind::Modified);
        assert_eq!(slots.declared(), &[SignalKind::SizeChanged, SignalKind::Modified]);
    }
}
