//! Core library for overlay-tree topology management.
//!
//! This crate provides the fundamental abstractions for building the rooted
//! communication tree that coordinates distributed worker/relay processes:
//! - Node identity and child linkage
//! - Topology construction, lookup, and validation (cycles, connectivity)
//! - The recursive bracketed wire encoding and its stepwise parser
//! - Leaf endpoint enumeration for the connection layer

pub mod codec;
pub mod endpoint;
pub mod error;
pub mod node;
pub mod topology;

pub use codec::{Children, EncodedTree, TreeEncoder, TreeParser};
pub use endpoint::Endpoint;
pub use error::{Error, Result};
pub use node::{Node, NodeId, Rank};
pub use topology::Topology;
