//! Graph error types

use thiserror::Error;

use crate::port::PortDirection;

/// Errors raised while wiring or querying the view graph
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Output and input carry different value types
    #[error("cannot connect output `{output}` ({found}) to input `{input}` ({expected})")]
    TypeMismatch {
        output: String,
        input: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A port was used on the wrong side of a connection
    #[error("port `{port}` is not an {expected:?} port")]
    DirectionMismatch {
        port: String,
        expected: PortDirection,
    },

    /// A node was asked for a port it does not have
    #[error("node `{node}` has no {direction:?} port named `{name}`")]
    PortNotFound {
        node: String,
        name: String,
        direction: PortDirection,
    },

    /// An input was read while no producer is connected
    #[error("input `{0}` has no producer")]
    DisconnectedInput(String),

    /// The connection handle outlived its edge
    #[error("connection was released")]
    ConnectionReleased,
}

/// A filter could not transform a signal
///
/// Never escapes the signal bus: the untransformed signal is delivered
/// instead and the fault is reported to the diagnostic sink.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("filter fault: {0}")]
pub struct FilterFault(pub String);

impl FilterFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Result type for graph operations
pub type Result<T> = std::result::Result<T, GraphError>;
