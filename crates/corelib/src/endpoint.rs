//! Leaf endpoint descriptors.
//!
//! An `Endpoint` describes one backend (leaf) of the overlay tree. The
//! ordered endpoint list produced by `Topology::endpoints` is what the
//! external connection-establishment layer consumes to open leaf links; its
//! order is depth-first preorder, i.e. left-to-right leaf order.

use crate::node::{NodeId, Rank};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Descriptor for a single leaf of the tree.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Endpoint {
    id: NodeId,
    rank: Rank,
}

impl Endpoint {
    pub(crate) fn new(id: NodeId, rank: Rank) -> Self {
        Self { id, rank }
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
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Endpoint({}, rank={})", self.id, self.rank)
    }
}
