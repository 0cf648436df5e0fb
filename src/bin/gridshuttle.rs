//! gridshuttle CLI - multi-agent grid navigation trained with tabular
//! Q-learning
//!
//! Agents shuttle between two waypoints on a shared grid, learning
//! per-agent policies that avoid head-on collisions. This binary runs the
//! budget-governed training loop and reports the final statistics.

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gridshuttle")]
#[command(version, about = "Multi-agent waypoint navigation via tabular Q-learning", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train agents and report final statistics
    Train(gridshuttle::cli::commands::train::TrainArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Train(args) => gridshuttle::cli::commands::train::execute(args),
    }
}
