//! Command-line argument parsing for the fleet-cli binary.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fleet-cli", about = "Runs the fleet scheduling pipeline against JSON input files")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the pipeline once over a routes file and write the result as JSON.
    Run(RunArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Path to a JSON array of `Route` records.
    #[arg(long)]
    pub routes: PathBuf,

    /// Path to a JSON array of `VehicleProfile` records. Omit to schedule
    /// with no real fleet (every bus comes out "virtual").
    #[arg(long)]
    pub vehicles: Option<PathBuf>,

    /// Path to a JSON `FullConfig` override. Omit to run with defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Where to write the resulting `PipelineResult` JSON.
    #[arg(long)]
    pub output: PathBuf,

    /// Base URL of an OSRM-compatible routing service, e.g.
    /// `http://localhost:5000`. Omit to run purely on the straight-line
    /// fallback estimator.
    #[arg(long)]
    pub osrm_url: Option<String>,

    /// Path to a travel-time cache snapshot: loaded before the run and
    /// saved back afterward.
    #[arg(long)]
    pub cache: Option<PathBuf>,
}
