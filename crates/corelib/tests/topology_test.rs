//! Comprehensive tests for topology construction, validation, and the wire
//! round trip.
//!
//! # Test Strategy
//!
//! 1. **Round-trip**: serialize then fully re-parse, comparing identity,
//!    rank, and child order
//! 2. **Uniqueness**: duplicate registration is rejected without side effects
//! 3. **Validation**: cycle detection and connectivity as independent checks
//! 4. **Leaf classification**: endpoints in DFS preorder
//! 5. **Concrete wire examples**: exact strings from the format contract

use corelib::{Endpoint, Error, NodeId, Rank, Topology, TreeParser};

/// Recursively parsed image of one node, rebuilt purely through the
/// stepwise parser API.
#[derive(Debug, PartialEq, Eq)]
struct ParsedNode {
    id: NodeId,
    rank: Rank,
    children: Vec<ParsedNode>,
}

fn parse_tree(parser: &TreeParser) -> ParsedNode {
    let mut parsed = ParsedNode {
        id: parser.root_id().expect("ident token"),
        rank: parser.root_rank().expect("rank token"),
        children: Vec::new(),
    };
    let mut cursor = parser.clone();
    if cursor.has_children().expect("well-formed node") {
        cursor.seek_first_child().expect("child list present");
        while let Some(child) = cursor.next_child().expect("well-formed child") {
            parsed.children.push(parse_tree(&child));
        }
    }
    parsed
}

/// Root with two relays, each fanning out to two backends, plus one backend
/// directly under the root. Seven nodes, five leaves.
fn sample_topology() -> Topology {
    let mut topo = Topology::new();
    let fe = topo.register("fe", 5000, 0).unwrap();
    let r0 = topo.register("relay0", 5001, 1).unwrap();
    let r1 = topo.register("relay1", 5002, 2).unwrap();
    let b0 = topo.register("be0", 7000, 3).unwrap();
    let b1 = topo.register("be1", 7001, 4).unwrap();
    let b2 = topo.register("be2", 7002, 5).unwrap();
    let b3 = topo.register("be3", 7003, 6).unwrap();

    topo.set_root(&fe).unwrap();
    topo.link(&fe, &r0).unwrap();
    topo.link(&fe, &r1).unwrap();
    topo.link(&fe, &b3).unwrap();
    topo.link(&r0, &b0).unwrap();
    topo.link(&r0, &b1).unwrap();
    topo.link(&r1, &b2).unwrap();
    topo
}

// ============================================================================
// Round-Trip Tests
// ============================================================================

#[test]
fn test_round_trip_reconstructs_identities_ranks_and_order() {
    let topo = sample_topology();
    let encoded = topo.serialize().unwrap();

    let parsed = parse_tree(&encoded.parser());

    assert_eq!(parsed.id, NodeId::new("fe", 5000));
    assert_eq!(parsed.rank, Rank(0));
    assert_eq!(parsed.children.len(), 3);

    let r0 = &parsed.children[0];
    assert_eq!(r0.id, NodeId::new("relay0", 5001));
    assert_eq!(r0.rank, Rank(1));
    let hosts: Vec<&str> = r0.children.iter().map(|c| c.id.hostname.as_str()).collect();
    assert_eq!(hosts, ["be0", "be1"], "child order must survive the round trip");

    let r1 = &parsed.children[1];
    assert_eq!(r1.children.len(), 1);
    assert_eq!(r1.children[0].id, NodeId::new("be2", 7002));

    let b3 = &parsed.children[2];
    assert_eq!(b3.id, NodeId::new("be3", 7003));
    assert!(b3.children.is_empty());
}

#[test]
fn test_round_trip_single_node_tree() {
    let mut topo = Topology::new();
    let solo = topo.register("solo", 4000, 0).unwrap();
    topo.set_root(&solo).unwrap();

    let encoded = topo.serialize().unwrap();
    assert_eq!(encoded.as_str(), "solo:4000 0");

    let parser = encoded.parser();
    assert_eq!(parser.root_id().unwrap(), NodeId::new("solo", 4000));
    assert!(!parser.has_children().unwrap());
    assert_eq!(parser.node_count().unwrap(), 1);
    assert_eq!(parser.leaf_count().unwrap(), 1);
}

#[test]
fn test_encoding_outlives_the_source_topology() {
    let encoded = {
        let topo = sample_topology();
        topo.serialize().unwrap()
    };
    // Source topology dropped; the string stands alone.
    assert_eq!(encoded.parser().node_count().unwrap(), 7);
}

#[test]
fn test_parser_counts_match_topology() {
    let topo = sample_topology();
    let encoded = topo.serialize().unwrap();
    let parser = encoded.parser();

    assert_eq!(parser.node_count().unwrap(), topo.size());
    assert_eq!(parser.leaf_count().unwrap(), topo.endpoints().unwrap().len());
}

// ============================================================================
// Uniqueness Tests
// ============================================================================

#[test]
fn test_duplicate_registration_rejected() {
    let mut topo = Topology::new();
    topo.register("A", 1, 0).unwrap();
    topo.register("A", 2, 1).unwrap(); // same host, different port: fine

    let err = topo.register("A", 1, 9).unwrap_err();
    assert_eq!(err, Error::DuplicateNode(NodeId::new("A", 1)));

    // Registry unchanged: size and contents unaffected.
    assert_eq!(topo.size(), 2);
    assert_eq!(topo.find("A", 1).unwrap().rank(), Rank(0));
}

// ============================================================================
// Validation Tests
// ============================================================================

#[test]
fn test_back_edge_reports_cycle() {
    let mut topo = Topology::new();
    let a = topo.register("A", 1, 0).unwrap();
    let b = topo.register("B", 2, 1).unwrap();
    let c = topo.register("C", 3, 2).unwrap();
    topo.set_root(&a).unwrap();
    topo.link(&a, &b).unwrap();
    topo.link(&b, &c).unwrap();

    assert!(!topo.has_cycle());
    assert!(topo.is_fully_connected());

    // Inject the back edge: C re-adds its ancestor A as a child.
    topo.link(&c, &a).unwrap();
    assert!(topo.has_cycle());
    assert!(!topo.is_fully_connected());
    assert_eq!(topo.validate().unwrap_err(), Error::CycleDetected(a));
}

#[test]
fn test_cycle_traversal_is_bounded() {
    // A genuinely cyclic two-node graph; has_cycle must still terminate.
    let mut topo = Topology::new();
    let a = topo.register("A", 1, 0).unwrap();
    let b = topo.register("B", 2, 1).unwrap();
    topo.set_root(&a).unwrap();
    topo.link(&a, &b).unwrap();
    topo.link(&b, &a).unwrap();

    assert!(topo.has_cycle());
    assert!(matches!(topo.serialize(), Err(Error::CycleDetected(_))));
}

#[test]
fn test_unreachable_node_is_disconnected_not_cyclic() {
    let mut topo = Topology::new();
    let a = topo.register("A", 1, 0).unwrap();
    let b = topo.register("B", 2, 1).unwrap();
    topo.register("orphan", 3, 2).unwrap();
    topo.set_root(&a).unwrap();
    topo.link(&a, &b).unwrap();

    assert!(!topo.has_cycle(), "disconnection is not a cycle");
    assert!(!topo.is_fully_connected());
    assert_eq!(
        topo.validate().unwrap_err(),
        Error::Disconnected { reached: 2, registered: 3 }
    );

    // Serialization still emits the root-reachable component.
    assert_eq!(topo.serialize().unwrap().as_str(), "A:1 0 [ B:2 1 ]");
}

#[test]
fn test_fully_connected_tree() {
    let topo = sample_topology();
    assert!(!topo.has_cycle());
    assert!(topo.is_fully_connected());
    topo.validate().unwrap();
}

// ============================================================================
// Leaf Classification Tests
// ============================================================================

#[test]
fn test_endpoints_are_leaves_in_preorder() {
    let topo = sample_topology();
    let endpoints = topo.endpoints().unwrap();

    let hosts: Vec<&str> = endpoints.iter().map(Endpoint::hostname).collect();
    assert_eq!(
        hosts,
        ["be0", "be1", "be2", "be3"],
        "DFS preorder = left-to-right leaf order"
    );
    let ranks: Vec<Rank> = endpoints.iter().map(Endpoint::rank).collect();
    assert_eq!(ranks, [Rank(3), Rank(4), Rank(5), Rank(6)]);
}

#[test]
fn test_internal_nodes_never_appear_as_endpoints() {
    let topo = sample_topology();
    let endpoints = topo.endpoints().unwrap();
    assert!(endpoints.iter().all(|e| topo.get(e.id()).unwrap().is_leaf()));
}

// ============================================================================
// Concrete Wire Examples
// ============================================================================

#[test]
fn test_contract_example_encoding() {
    let mut topo = Topology::new();
    let a = topo.register("A", 1, 0).unwrap();
    let b = topo.register("B", 2, 1).unwrap();
    let c = topo.register("C", 3, 2).unwrap();
    topo.set_root(&a).unwrap();
    topo.link(&a, &b).unwrap();
    topo.link(&a, &c).unwrap();

    let encoded = topo.serialize().unwrap();
    assert_eq!(encoded.as_str(), "A:1 0 [ B:2 1 C:3 2 ]");
}

#[test]
fn test_contract_example_parsing() {
    let mut parser = TreeParser::new("A:1 0 [ B:2 1 C:3 2 ]");
    assert_eq!(parser.root_hostname().unwrap(), "A");
    assert_eq!(parser.root_port().unwrap(), 1);
    assert_eq!(parser.root_rank().unwrap(), Rank(0));
    assert!(parser.has_children().unwrap());

    let b = parser.next_child().unwrap().unwrap();
    assert_eq!(b.root_id().unwrap(), NodeId::new("B", 2));
    assert_eq!(b.root_rank().unwrap(), Rank(1));
    assert!(!b.has_children().unwrap());

    let c = parser.next_child().unwrap().unwrap();
    assert_eq!(c.root_id().unwrap(), NodeId::new("C", 3));
    assert_eq!(c.root_rank().unwrap(), Rank(2));
    assert!(!c.has_children().unwrap());

    assert!(parser.next_child().unwrap().is_none());
}

#[test]
fn test_contract_example_lookup() {
    let mut topo = Topology::new();
    let a = topo.register("A", 1, 0).unwrap();
    let b = topo.register("B", 2, 1).unwrap();
    let c = topo.register("C", 3, 2).unwrap();
    topo.set_root(&a).unwrap();
    topo.link(&a, &b).unwrap();
    topo.link(&a, &c).unwrap();

    assert_eq!(topo.find("B", 2).unwrap().rank(), Rank(1));
    assert!(topo.find("Z", 9).is_none());
}
