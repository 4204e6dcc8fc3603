//! Node abstractions for the overlay tree.
//!
//! Nodes represent addressable participants in the communication tree. They
//! are identified by a `NodeId` — the `(hostname, port)` pair that is the
//! globally unique key into the topology registry.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity key for a node: `(hostname, port)`, globally unique.
///
/// Displays as `hostname:port`, which is exactly the ident token the wire
/// encoding uses.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct NodeId {
    pub hostname: String,
    pub port: u16,
}

impl NodeId {
    /// Construct an identity from a hostname and port.
    ///
    /// Grammar validity (no `':'` or whitespace in the hostname, non-zero
    /// port) is enforced at [`Topology::register`](crate::Topology::register),
    /// so plain construction stays infallible.
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hostname, self.port)
    }
}

/// Caller-assigned unique integer identifying a node across the whole tree.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rank(pub u32);

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Rank {
    fn from(n: u32) -> Self {
        Rank(n)
    }
}

/// A single participant in the overlay tree.
///
/// Holds identity and child linkage only; child entries are non-owning
/// `NodeId` handles into the owning [`Topology`](crate::Topology)'s registry,
/// never pointers between nodes. Identity never changes after insertion.
#[derive(Clone, Debug)]
pub struct Node {
    id: NodeId,
    rank: Rank,
    /// Ordered child handles. Order is call order and fixes the canonical
    /// left-to-right order for serialization and leaf enumeration.
    children: Vec<NodeId>,
}

impl Node {
    pub(crate) fn new(id: NodeId, rank: Rank) -> Self {
        Self {
            id,
            rank,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn hostname(&self) -> &str {
        &self.id.hostname
    }

    pub fn port(&self) -> u16 {
        self.id.port
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Ordered child handles, left to right.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// True if this node has no children (a backend/worker endpoint).
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Append a child handle. Crate-internal: all linkage goes through
    /// `Topology::link` so cached validation state is invalidated.
    pub(crate) fn add_child(&mut self, child: NodeId) {
        self.children.push(child);
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.rank)
    }
}
