//! Command implementations.

use anyhow::Context;
use clap::Subcommand;
use corelib::{Topology, TreeParser};
use std::fs;
use std::io::Read;
use std::path::PathBuf;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build a balanced demonstration topology, validate it, and print its
    /// encoding.
    Gen {
        /// Number of distinct hostnames to spread nodes across.
        #[arg(long, default_value_t = 4)]
        hosts: usize,
        /// Children per internal node.
        #[arg(long, default_value_t = 2)]
        fanout: usize,
        /// Tree depth below the root.
        #[arg(long, default_value_t = 2)]
        depth: usize,
        /// Emit a JSON summary (encoding, counts, endpoints).
        #[arg(long)]
        json: bool,
    },
    /// Structurally check an encoding read from a file or stdin.
    Check {
        /// Input file; stdin when omitted.
        file: Option<PathBuf>,
    },
    /// Print an indented rendering of an encoding, navigating it stepwise
    /// the way a remote receiver would.
    Inspect {
        /// Input file; stdin when omitted.
        file: Option<PathBuf>,
        /// Maximum depth to descend below the root.
        #[arg(long)]
        depth: Option<usize>,
    },
}

impl Command {
    pub fn run(self) -> anyhow::Result<()> {
        match self {
            Command::Gen {
                hosts,
                fanout,
                depth,
                json,
            } => gen(hosts, fanout, depth, json),
            Command::Check { file } => check(file),
            Command::Inspect { file, depth } => inspect(file, depth),
        }
    }
}

fn gen(hosts: usize, fanout: usize, depth: usize, json: bool) -> anyhow::Result<()> {
    anyhow::ensure!(hosts > 0, "--hosts must be at least 1");
    anyhow::ensure!(fanout > 0, "--fanout must be at least 1");
    anyhow::ensure!(
        tree_size(fanout, depth).is_some_and(|n| n <= 60_000),
        "topology too large for the demo port range"
    );

    let mut topo = Topology::new();
    let root = topo.register(host_name(0, hosts), 5000, 0u32)?;
    topo.set_root(&root)?;

    // Breadth-first fill: every node above the last level gets `fanout`
    // children; ranks and ports are assigned sequentially.
    let mut level = vec![root];
    let mut next: u32 = 1;
    for _ in 0..depth {
        let mut below = Vec::new();
        for parent in &level {
            for _ in 0..fanout {
                let id = topo.register(
                    host_name(next as usize, hosts),
                    5000 + next as u16,
                    next,
                )?;
                topo.link(parent, &id)?;
                below.push(id);
                next += 1;
            }
        }
        level = below;
    }

    topo.validate()?;
    let encoded = topo.serialize()?;
    if json {
        let summary = serde_json::json!({
            "encoding": encoded,
            "nodes": topo.size(),
            "backends": topo.endpoints()?.len(),
            "endpoints": topo.endpoints()?,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", encoded);
    }
    Ok(())
}

fn check(file: Option<PathBuf>) -> anyhow::Result<()> {
    let text = read_input(file)?;
    let parser = TreeParser::new(text.trim_end_matches(['\n', '\r']));
    let nodes = parser.node_count()?;
    let backends = parser.leaf_count()?;
    println!("ok: {} nodes, {} backends", nodes, backends);
    Ok(())
}

fn inspect(file: Option<PathBuf>, depth: Option<usize>) -> anyhow::Result<()> {
    let text = read_input(file)?;
    let parser = TreeParser::new(text.trim_end_matches(['\n', '\r']));
    render(&parser, 0, depth.unwrap_or(usize::MAX))
}

fn render(parser: &TreeParser, indent: usize, remaining: usize) -> anyhow::Result<()> {
    println!(
        "{:indent$}{} {}",
        "",
        parser.root_id()?,
        parser.root_rank()?,
        indent = indent * 2
    );
    if remaining == 0 {
        return Ok(());
    }
    for child in parser.children() {
        render(&child?, indent + 1, remaining - 1)?;
    }
    Ok(())
}

fn host_name(index: usize, hosts: usize) -> String {
    format!("host{}", index % hosts)
}

/// Nodes in a complete tree of the given fanout and depth; `None` on
/// overflow.
fn tree_size(fanout: usize, depth: usize) -> Option<u64> {
    let fanout = fanout as u64;
    let mut total: u64 = 0;
    let mut level: u64 = 1;
    for _ in 0..=depth {
        total = total.checked_add(level)?;
        level = level.checked_mul(fanout)?;
        if total > 1_000_000 {
            return None;
        }
    }
    Some(total)
}

fn read_input(file: Option<PathBuf>) -> anyhow::Result<String> {
    match file {
        Some(path) => {
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))
        }
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            Ok(buf)
        }
    }
}
