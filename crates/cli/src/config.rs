//! Command-line configuration.

use crate::commands::Command;
use clap::Parser;

/// Overlay-tree topology tooling.
#[derive(Debug, Parser)]
#[command(
    name = "overlay-tree",
    version,
    about = "Build, check, and inspect overlay-tree encodings"
)]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    pub fn run(self) -> anyhow::Result<()> {
        self.command.run()
    }
}
