//! Builder half of the wire codec.

use crate::codec::parser::TreeParser;
use crate::node::{NodeId, Rank};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};

/// Append-only builder for the tree encoding.
///
/// Driven by the preorder traversal in `Topology::serialize`: leaves are
/// emitted with [`add_leaf`](TreeEncoder::add_leaf), internal nodes open a
/// bracketed child list with [`open_subtree`](TreeEncoder::open_subtree) and
/// close it with [`close_subtree`](TreeEncoder::close_subtree). The buffer
/// grows monotonically; a builder is created fresh per serialization and
/// consumed by [`finish`](TreeEncoder::finish).
///
/// Contract: `open_subtree`/`close_subtree` calls must be balanced by the
/// caller. Unbalanced use yields an unparsable buffer; the parser detects
/// that rather than assuming it absent.
#[derive(Debug, Default)]
pub struct TreeEncoder {
    buffer: String,
    depth: usize,
}

impl TreeEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current bracket nesting depth (open subtrees not yet closed).
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Append a leaf (backend) token at the current write position.
    pub fn add_leaf(&mut self, id: &NodeId, rank: Rank) {
        self.separator();
        self.push_node_token(id, rank);
    }

    /// Append an internal-node token and its opening bracket.
    pub fn open_subtree(&mut self, id: &NodeId, rank: Rank) {
        self.separator();
        self.push_node_token(id, rank);
        self.buffer.push_str(" [");
        self.depth += 1;
    }

    /// Append the closing bracket for the innermost still-open subtree.
    pub fn close_subtree(&mut self) {
        debug_assert!(self.depth > 0, "close_subtree without matching open_subtree");
        self.buffer.push_str(" ]");
        self.depth = self.depth.saturating_sub(1);
    }

    /// Consume the builder and hand off the finished encoding.
    pub fn finish(self) -> EncodedTree {
        debug_assert_eq!(self.depth, 0, "unbalanced open_subtree at finish");
        EncodedTree(self.buffer)
    }

    fn separator(&mut self) {
        if !self.buffer.is_empty() {
            self.buffer.push(' ');
        }
    }

    fn push_node_token(&mut self, id: &NodeId, rank: Rank) {
        // `{id}` renders as `hostname:port`, the wire ident. Writing to a
        // String is infallible.
        let _ = write!(self.buffer, "{} {}", id, rank);
    }
}

/// A finished, self-contained tree encoding.
///
/// Independent of the topology that produced it: it stays valid after the
/// source graph is mutated or destroyed, and can be handed to the transport
/// layer as-is. Serde-transparent so ops tooling can embed it in JSON.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedTree(String);

impl EncodedTree {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A fresh parser over this encoding. Cheap: parsers borrow the buffer.
    pub fn parser(&self) -> TreeParser<'_> {
        TreeParser::new(&self.0)
    }
}

impl fmt::Display for EncodedTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
