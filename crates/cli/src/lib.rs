//! CLI tool for overlay-tree topologies.
//!
//! Provides commands for:
//! - Generating and validating demonstration topologies
//! - Structurally checking a received encoding
//! - Inspecting an encoding stepwise without building a graph

pub mod commands;
pub mod config;

pub use commands::Command;
pub use config::CliConfig;
