//! fleet-cli: a thin runnable harness around `fleet-core`'s pipeline.
//!
//! Loads a routes file and an optional vehicle-registry file, runs the
//! pipeline for every weekday the routes cover, and writes the resulting
//! `PipelineResult` back out as JSON. Stands in for the REST ingestion and
//! persistence layers that are out of scope for the optimization core
//! itself.

mod cli;
mod error;
mod io;

use clap::Parser;
use cli::{Cli, Command, RunArgs};
use error::CliError;
use fleet_core::oracle::{OsrmProvider, TravelTimeOracle, TravelTimeProvider};
use fleet_core::pipeline::run_pipeline;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,fleet_cli=debug")))
        .init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Command::Run(args) => run(args).await,
    };

    match outcome {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run(args: RunArgs) -> Result<(), CliError> {
    let routes = io::load_routes(&args.routes)?;
    let registry = io::load_vehicle_registry(args.vehicles.as_ref())?;
    let config = io::load_config(args.config.as_ref())?;

    tracing::info!(
        routes = routes.len(),
        vehicles = registry.len(),
        "loaded pipeline input"
    );

    let provider: Option<Box<dyn TravelTimeProvider>> = args
        .osrm_url
        .as_ref()
        .map(|url| Box::new(OsrmProvider::new(url.clone(), Duration::from_millis(config.oracle.per_call_timeout_ms))) as Box<dyn TravelTimeProvider>);
    if provider.is_some() {
        tracing::info!(osrm_url = args.osrm_url.as_deref().unwrap_or(""), "routing via OSRM provider");
    } else {
        tracing::info!("no OSRM url given; running on the straight-line fallback estimator");
    }

    let oracle = TravelTimeOracle::new(provider, config.geometry, config.oracle.clone());
    if let Some(cache_path) = &args.cache {
        if let Err(err) = oracle.load_snapshot_from_file(cache_path) {
            tracing::warn!(path = %cache_path.display(), error = %err, "failed to load travel-time cache snapshot");
        }
    }

    let progress = Arc::new(|message: &str| tracing::info!("{message}"));
    let result = run_pipeline(routes, registry.into_profiles(), config, &oracle, progress).await?;

    if let Some(cache_path) = &args.cache {
        if let Err(err) = oracle.save_snapshot_to_file(cache_path) {
            tracing::warn!(path = %cache_path.display(), error = %err, "failed to save travel-time cache snapshot");
        }
    }

    tracing::info!(
        best_buses = result.metrics.best_buses,
        infeasible_buses = result.metrics.infeasible_buses,
        "pipeline finished"
    );
    io::write_json(&args.output, &result)?;
    Ok(())
}
