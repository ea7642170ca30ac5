//! Passing backward signals from a composite to its children

use std::rc::Rc;

use pipeview_core::{Port, Process, SignalKind};
use smallvec::SmallVec;

/// Pass signals of `kind` arriving at `from` on to the ports `targets` picks
///
/// Only signals nobody has claimed yet are passed on, and the relay stops at
/// the first target that claims one. The node is held weakly.
pub(crate) fn relay<P, F>(node: &Rc<P>, from: &Port, kind: SignalKind, targets: F)
where
    P: Process + 'static,
    F: Fn(&P) -> SmallVec<[Port; 4]> + 'static,
{
    let weak = Rc::downgrade(node);
    from.register_callback(kind, node.core().id(), move |signal| {
        let Some(node) = weak.upgrade() else {
            return;
        };
        for target in targets(&node) {
            if signal.processed() {
                break;
            }
            tracing::trace!(
                target: "pipeview::relay",
                node = %node.core().name(),
                to = %target.name(),
                kind = ?signal.kind(),
                "relay"
            );
            target.fire(signal);
        }
    });
}
