use std::num::ParseIntError;

use thiserror::Error;

/// Failures surfaced by the library. All of them are fatal for the
/// computation they occur in; none is a recoverable state.
#[derive(Error, Debug)]
pub enum Error {
    /// The input does not describe a simple graph (bad line shape, self-loop).
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A token that should have been a vertex id did not parse.
    #[error("invalid integer token")]
    ParseInt(#[from] ParseIntError),

    /// Reading the input failed.
    #[error("io error")]
    Io(#[from] std::io::Error),

    /// An arena handle referred to a dead or out-of-range slot. Indicates an
    /// internal bug; reported by the forest consistency checker.
    #[error("invalid handle: {0}")]
    InvalidHandle(String),

    /// A structural invariant of the forest was violated. Indicates an
    /// internal bug; reported by the forest consistency checker.
    #[error("precondition violated: {0}")]
    PreconditionViolated(String),

    /// The dense adjacency backing cannot represent a graph of this size.
    #[error("graph with {nodes} nodes is too large for the dense backing (max {max})")]
    Overflow { nodes: usize, max: usize },
}
