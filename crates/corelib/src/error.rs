//! Error types for the core library.

use crate::node::NodeId;
use thiserror::Error;

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the core library.
///
/// Lookup misses are not errors: `Topology::find`/`get` return `Option`
/// because probing lookups are routine during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Registration with an already-present `(hostname, port)` identity.
    /// The registry is left unchanged.
    #[error("duplicate node: {0} is already registered")]
    DuplicateNode(NodeId),
    /// A handle passed to `link`/`set_root` that is not in the registry.
    #[error("node not found: {0} is not registered")]
    NodeNotFound(NodeId),
    /// An identity that cannot appear in the wire grammar.
    #[error("invalid node: {0}")]
    InvalidNode(String),
    /// Serialize/validate called before a root was assigned.
    #[error("no root node assigned")]
    NoRoot,
    /// An edge re-reaches a node already on the traversal path, or a node
    /// is linked under more than one parent during serialization.
    #[error("cycle detected at node {0}")]
    CycleDetected(NodeId),
    /// A full traversal from root did not reach every registered node.
    #[error("topology disconnected: reached {reached} of {registered} registered nodes")]
    Disconnected { reached: usize, registered: usize },
    /// Structurally invalid encoding discovered while parsing.
    #[error("malformed encoding at byte {offset}: {reason}")]
    MalformedEncoding { offset: usize, reason: String },
}

impl Error {
    /// Shorthand for a `MalformedEncoding` at a byte offset.
    pub(crate) fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        Error::MalformedEncoding {
            offset,
            reason: reason.into(),
        }
    }
}
