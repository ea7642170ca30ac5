//! Test harness: a consumer standing in for a window

use std::cell::RefCell;
use std::rc::Rc;

use pipeview_core::{connect, Context, InputPort, NodeId, PainterRef, Port, Rect, Signal, SignalKind};

/// Input wired to a view output that records every forward signal it gets
pub(crate) struct Tap<T = PainterRef> {
    input: InputPort<T>,
    log: Rc<RefCell<Vec<Signal>>>,
}

impl Tap<PainterRef> {
    /// Connect to a `painter` output
    pub(crate) fn attach(output: &Port, ctx: &Context) -> Self {
        Self::attach_typed(output, ctx)
    }
}

impl<T: Clone + 'static> Tap<T> {
    /// Connect to `output`; the connection's own `InputSet` is not recorded
    pub(crate) fn attach_typed(output: &Port, ctx: &Context) -> Self {
        let input = InputPort::new("tap", NodeId::next(), ctx);
        let log = Rc::new(RefCell::new(Vec::new()));
        {
            let log = log.clone();
            input
                .port()
                .register_callback(SignalKind::Modified, NodeId::next(), move |s| {
                    log.borrow_mut().push(s.clone())
                });
        }
        connect(output, &input).unwrap();
        log.borrow_mut().clear();
        Self { input, log }
    }

    /// Issue an `Update` pull and read the value
    pub(crate) fn pull(&self) -> Option<T> {
        self.input.port().fire(&mut Signal::update());
        self.input.get()
    }

    /// Send `signal` towards the producer; returns whether anyone claimed it
    pub(crate) fn send(&self, mut signal: Signal) -> bool {
        self.input.port().fire(&mut signal);
        signal.processed()
    }

    pub(crate) fn kinds(&self) -> Vec<SignalKind> {
        self.log.borrow().iter().map(Signal::kind).collect()
    }

    /// Rects of the `SizeChanged` signals received so far
    pub(crate) fn sizes(&self) -> Vec<Rect> {
        self.log
            .borrow()
            .iter()
            .filter(|s| s.kind() == SignalKind::SizeChanged)
            .filter_map(Signal::rect)
            .collect()
    }

    pub(crate) fn clear(&self) {
        self.log.borrow_mut().clear();
    }
}
