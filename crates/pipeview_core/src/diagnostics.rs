//! Diagnostic sink and construction context
//!
//! Components never reach for a global logger. Each node is built with a
//! [`Context`] and reports recovered faults through the sink it carries.
//! Chatter about ordinary signal flow goes to `tracing` only.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Category of a recovered fault
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// A filter failed and the signal passed through unchanged
    FilterFault,
    /// A painter could not draw; the frame shows no change
    RenderBackendUnavailable,
    /// A signal was fired in the wrong direction or from an abstract kind
    MisroutedSignal,
}

/// A recovered fault, reported once
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Component that observed the fault (a port or node name)
    pub source: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}: {}", self.kind, self.source, self.message)
    }
}

/// Receiver of diagnostics
pub trait DiagnosticSink {
    fn report(&self, diagnostic: Diagnostic);
}

/// Discards everything
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn report(&self, _diagnostic: Diagnostic) {}
}

/// Forwards diagnostics to `tracing` as warnings
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        tracing::warn!(
            target: "pipeview::diagnostics",
            kind = ?diagnostic.kind,
            source = %diagnostic.source,
            "{}",
            diagnostic.message
        );
    }
}

/// Keeps every diagnostic for later inspection
#[derive(Debug, Default)]
pub struct CollectingSink {
    collected: RefCell<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.collected.borrow().clone()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.collected
            .borrow()
            .iter()
            .filter(|d| d.kind == kind)
            .count()
    }

    pub fn clear(&self) {
        self.collected.borrow_mut().clear();
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: Diagnostic) {
        self.collected.borrow_mut().push(diagnostic);
    }
}

/// Construction context passed to every node
#[derive(Clone)]
pub struct Context {
    sink: Rc<dyn DiagnosticSink>,
}

impl Context {
    pub fn new() -> Self {
        Self {
            sink: Rc::new(NullSink),
        }
    }

    pub fn with_sink(sink: Rc<dyn DiagnosticSink>) -> Self {
        Self { sink }
    }

    /// Report a fault to the sink
    pub fn report(&self, diagnostic: Diagnostic) {
        self.sink.report(diagnostic);
    }

    pub fn sink(&self) -> &Rc<dyn DiagnosticSink> {
        &self.sink
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_sink_counts_by_kind() {
        let sink = Rc::new(CollectingSink::new());
        let ctx = Context::with_sink(sink.clone());

        ctx.report(Diagnostic::new(DiagnosticKind::FilterFault, "zoom", "singular"));
        ctx.report(Diagnostic::new(
            DiagnosticKind::RenderBackendUnavailable,
            "window",
            "no surface",
        ));

        assert_eq!(sink.count(DiagnosticKind::FilterFault), 1);
        assert_eq!(sink.diagnostics().len(), 2);
        sink.clear();
        assert!(sink.diagnostics().is_empty());
    }

    #[test]
    fn test_default_context_discards() {
        let ctx = Context::default();
        ctx.report(Diagnostic::new(DiagnosticKind::FilterFault, "x", "y"));
    }
}
