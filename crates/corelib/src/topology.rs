//! Overlay tree topology: node registry, validation, serialization.
//!
//! `Topology` is the single owner of all node storage. Parent/child linkage
//! is kept as `NodeId` handles into the registry, never pointers between
//! nodes, so linkage can never dangle and future node removal stays safe.
//! Construction is single-authority and single-threaded; once assembly
//! completes, the query/serialize operations treat the graph as read-only.

use crate::codec::{EncodedTree, TreeEncoder};
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::node::{Node, NodeId, Rank};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// Outcome of the bounded validation traversal from root.
#[derive(Clone, Debug, Default)]
struct Validation {
    /// First node reached while still on the active recursion path.
    cycle: Option<NodeId>,
    /// First node reached a second time through a different parent.
    revisit: Option<NodeId>,
    /// Distinct nodes reached from root.
    reached: usize,
}

/// Serialization result: the wire image plus the leaves collected during
/// the same preorder traversal.
#[derive(Clone, Debug)]
struct Snapshot {
    encoded: EncodedTree,
    endpoints: Vec<Endpoint>,
}

/// The rooted overlay tree under assembly.
///
/// An external topology authority registers nodes, links children, and
/// assigns the root; the topology validates the result and produces the
/// transmittable encoding plus the ordered leaf endpoint list.
///
/// Validation and serialization results are cached internally and
/// invalidated on every mutation. The caches use `RefCell`, which is sound
/// under the crate's single-threaded assembly contract.
///
/// # Example
///
/// ```rust
/// use corelib::Topology;
///
/// let mut topo = Topology::new();
/// let root = topo.register("A", 1, 0)?;
/// let leaf = topo.register("B", 2, 1)?;
/// topo.set_root(&root)?;
/// topo.link(&root, &leaf)?;
/// assert_eq!(topo.serialize()?.as_str(), "A:1 0 [ B:2 1 ]");
/// # Ok::<(), corelib::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct Topology {
    registry: HashMap<NodeId, Node>,
    root: Option<NodeId>,
    validation: RefCell<Option<Validation>>,
    snapshot: RefCell<Option<Snapshot>>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new node keyed by `(hostname, port)`.
    ///
    /// Fails with [`Error::DuplicateNode`] if the identity is already
    /// registered and with [`Error::InvalidNode`] if it cannot appear in
    /// the wire grammar (empty hostname, hostname containing `':'`,
    /// whitespace or brackets, port 0). The registry is unchanged on
    /// failure.
    pub fn register(
        &mut self,
        hostname: impl Into<String>,
        port: u16,
        rank: impl Into<Rank>,
    ) -> Result<NodeId> {
        let hostname = hostname.into();
        check_hostname(&hostname)?;
        if port == 0 {
            return Err(Error::InvalidNode(format!("{}: port must be non-zero", hostname)));
        }
        let id = NodeId::new(hostname, port);
        if self.registry.contains_key(&id) {
            return Err(Error::DuplicateNode(id));
        }
        let rank = rank.into();
        trace!(node = %id, rank = %rank, "registered node");
        self.registry.insert(id.clone(), Node::new(id.clone(), rank));
        self.invalidate();
        Ok(id)
    }

    /// Append `child` to `parent`'s ordered child list.
    ///
    /// Both handles must already be registered. Order is call order, fixing
    /// the left-to-right order for serialization and leaf enumeration. No
    /// cycle checking happens here: validation is an explicit query.
    pub fn link(&mut self, parent: &NodeId, child: &NodeId) -> Result<()> {
        if !self.registry.contains_key(child) {
            return Err(Error::NodeNotFound(child.clone()));
        }
        let node = self
            .registry
            .get_mut(parent)
            .ok_or_else(|| Error::NodeNotFound(parent.clone()))?;
        node.add_child(child.clone());
        trace!(parent = %parent, child = %child, "linked child");
        self.invalidate();
        Ok(())
    }

    /// Assign the distinguished root. The node must already be registered.
    pub fn set_root(&mut self, id: &NodeId) -> Result<()> {
        if !self.registry.contains_key(id) {
            return Err(Error::NodeNotFound(id.clone()));
        }
        debug!(root = %id, "root assigned");
        self.root = Some(id.clone());
        self.invalidate();
        Ok(())
    }

    /// The root node, if one has been assigned.
    pub fn root(&self) -> Option<&Node> {
        self.root.as_ref().and_then(|id| self.registry.get(id))
    }

    /// Look a node up by identity. A miss is `None`, not an error:
    /// speculative lookups are routine during assembly.
    pub fn find(&self, hostname: &str, port: u16) -> Option<&Node> {
        self.registry.get(&NodeId::new(hostname, port))
    }

    /// Look a node up by handle.
    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.registry.get(id)
    }

    /// Registry cardinality.
    pub fn size(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// All registered nodes, in no particular order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.registry.values()
    }

    /// True iff some edge reaches a node still on the active traversal
    /// path. Bounded by registry size, so it terminates on genuinely
    /// cyclic graphs. `false` when no root is assigned (nothing is
    /// traversed).
    pub fn has_cycle(&self) -> bool {
        self.validation().cycle.is_some()
    }

    /// True iff a full preorder traversal from root visits every
    /// registered node exactly once and the graph is acyclic.
    ///
    /// Connectivity and acyclicity are independent checks: a
    /// disconnected-but-acyclic forest is "not fully connected", never
    /// "cyclic". A node reachable through two parents violates "exactly
    /// once" and also reports `false`.
    pub fn is_fully_connected(&self) -> bool {
        if self.registry.is_empty() {
            return true;
        }
        if self.root.is_none() {
            return false;
        }
        let v = self.validation();
        v.cycle.is_none() && v.revisit.is_none() && v.reached == self.registry.len()
    }

    /// Combined structural check for the assembly authority: [`Error::NoRoot`]
    /// before a root is assigned, [`Error::CycleDetected`] for a back edge or
    /// a node linked under more than one parent, [`Error::Disconnected`] when
    /// the traversal misses registered nodes.
    pub fn validate(&self) -> Result<()> {
        if self.root.is_none() {
            return Err(Error::NoRoot);
        }
        let v = self.validation();
        if let Some(id) = v.cycle {
            return Err(Error::CycleDetected(id));
        }
        if let Some(id) = v.revisit {
            return Err(Error::CycleDetected(id));
        }
        if v.reached != self.registry.len() {
            return Err(Error::Disconnected {
                reached: v.reached,
                registered: self.registry.len(),
            });
        }
        Ok(())
    }

    /// Serialize the tree to its wire encoding.
    ///
    /// Depth-first preorder from root, reusing the cached traversal when the
    /// topology has not changed. Fails with [`Error::NoRoot`] before a root
    /// is assigned and with [`Error::CycleDetected`] if emission would
    /// re-reach a node; unbounded output is never attempted. A disconnected
    /// graph serializes its root-reachable component — connectivity stays a
    /// separate, explicit check. The returned encoding is self-contained and
    /// outlives any later mutation of this topology.
    pub fn serialize(&self) -> Result<EncodedTree> {
        Ok(self.snapshot()?.encoded)
    }

    /// Ordered leaf descriptors, collected during the same traversal that
    /// produced the current serialization: DFS preorder, i.e. left-to-right
    /// leaf order. Callers use this to map tree ranks to terminal worker
    /// processes.
    pub fn endpoints(&self) -> Result<Vec<Endpoint>> {
        Ok(self.snapshot()?.endpoints)
    }

    fn invalidate(&mut self) {
        *self.validation.get_mut() = None;
        *self.snapshot.get_mut() = None;
    }

    fn validation(&self) -> Validation {
        if let Some(v) = self.validation.borrow().as_ref() {
            return v.clone();
        }
        let v = self.compute_validation();
        *self.validation.borrow_mut() = Some(v.clone());
        v
    }

    /// Bounded preorder DFS from root with explicit visited and on-path
    /// sets (no marks on the nodes themselves, so traversals never need a
    /// reset pass and nest safely).
    fn compute_validation(&self) -> Validation {
        let mut v = Validation::default();
        let Some(root) = self.root() else {
            return v;
        };

        struct Frame<'a> {
            node: &'a Node,
            next: usize,
        }

        let mut visited: HashSet<&NodeId> = HashSet::new();
        let mut on_path: HashSet<&NodeId> = HashSet::new();
        let mut stack: Vec<Frame> = Vec::new();
        visited.insert(root.id());
        on_path.insert(root.id());
        stack.push(Frame { node: root, next: 0 });

        while let Some(frame) = stack.last_mut() {
            let node = frame.node;
            if frame.next >= node.children().len() {
                on_path.remove(node.id());
                stack.pop();
                continue;
            }
            let child_id = &node.children()[frame.next];
            frame.next += 1;

            if on_path.contains(child_id) {
                // Back edge: the child is an ancestor of the current node.
                if v.cycle.is_none() {
                    v.cycle = Some(child_id.clone());
                }
                continue;
            }
            if visited.contains(child_id) {
                // Already reached through another parent; do not descend.
                if v.revisit.is_none() {
                    v.revisit = Some(child_id.clone());
                }
                continue;
            }
            // Registry invariant: every linked handle resolves.
            let Some(child) = self.registry.get(child_id) else {
                continue;
            };
            visited.insert(child.id());
            on_path.insert(child.id());
            stack.push(Frame { node: child, next: 0 });
        }

        v.reached = visited.len();
        debug!(
            reached = v.reached,
            registered = self.registry.len(),
            cycle = v.cycle.is_some(),
            "validation traversal complete"
        );
        v
    }

    fn snapshot(&self) -> Result<Snapshot> {
        if let Some(s) = self.snapshot.borrow().as_ref() {
            return Ok(s.clone());
        }
        let s = self.compute_snapshot()?;
        *self.snapshot.borrow_mut() = Some(s.clone());
        Ok(s)
    }

    /// Preorder emission: leaf tokens for childless nodes, bracketed
    /// subtrees for internal ones, endpoints recorded in traversal order.
    fn compute_snapshot(&self) -> Result<Snapshot> {
        let root_id = self.root.as_ref().ok_or(Error::NoRoot)?;
        let root = self
            .registry
            .get(root_id)
            .ok_or_else(|| Error::NodeNotFound(root_id.clone()))?;

        struct Frame<'a> {
            node: &'a Node,
            next: usize,
        }

        let mut enc = TreeEncoder::new();
        let mut endpoints: Vec<Endpoint> = Vec::new();
        let mut visited: HashSet<&NodeId> = HashSet::new();
        let mut stack: Vec<Frame> = Vec::new();

        visited.insert(root.id());
        if root.is_leaf() {
            enc.add_leaf(root.id(), root.rank());
            endpoints.push(Endpoint::new(root.id().clone(), root.rank()));
        } else {
            enc.open_subtree(root.id(), root.rank());
            stack.push(Frame { node: root, next: 0 });
        }

        while let Some(frame) = stack.last_mut() {
            let node = frame.node;
            if frame.next >= node.children().len() {
                enc.close_subtree();
                stack.pop();
                continue;
            }
            let child_id = &node.children()[frame.next];
            frame.next += 1;

            let child = self
                .registry
                .get(child_id)
                .ok_or_else(|| Error::NodeNotFound(child_id.clone()))?;
            if !visited.insert(child.id()) {
                // Emitting would revisit: a wire image that misstates the
                // topology (or never terminates) must not be produced.
                return Err(Error::CycleDetected(child_id.clone()));
            }
            if child.is_leaf() {
                enc.add_leaf(child.id(), child.rank());
                endpoints.push(Endpoint::new(child.id().clone(), child.rank()));
            } else {
                enc.open_subtree(child.id(), child.rank());
                stack.push(Frame { node: child, next: 0 });
            }
        }

        let encoded = enc.finish();
        debug!(
            nodes = visited.len(),
            backends = endpoints.len(),
            bytes = encoded.len(),
            "serialized topology"
        );
        Ok(Snapshot { encoded, endpoints })
    }
}

fn check_hostname(hostname: &str) -> Result<()> {
    if hostname.is_empty() {
        return Err(Error::InvalidNode("empty hostname".to_string()));
    }
    if hostname.contains(':')
        || hostname.contains('[')
        || hostname.contains(']')
        || hostname.chars().any(char::is_whitespace)
    {
        return Err(Error::InvalidNode(format!(
            "hostname {:?} cannot appear in the wire encoding",
            hostname
        )));
    }
    Ok(())
}
