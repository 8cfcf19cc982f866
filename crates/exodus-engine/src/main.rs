//! Engine binary for the Exodus displacement simulation.
//!
//! Loads configuration, builds the location graph, and either runs the
//! configured number of steps or a step-time sweep over worker counts.
//!
//! # Startup Sequence
//!
//! 1. Parse arguments and load `exodus-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Load the location graph (JSON file or synthetic)
//! 4. Write `parameters.json`
//! 5. Build the simulation driver and hook Ctrl-C to its stop flag
//! 6. Run on a blocking task, writing step snapshots
//! 7. Write the summary and report

mod cli;
mod error;
mod input;
mod output;
mod trial;

use std::path::Path;
use std::sync::Arc;

use exodus_core::config::LoggingConfig;
use exodus_core::{RunControl, SimulationConfig, SimulationDriver};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::Args;
use crate::error::EngineError;
use crate::output::JsonSnapshotSink;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any initialization step or the run itself fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Arguments and configuration.
    let args = Args::parse(std::env::args().skip(1))?;
    let (config, config_found) = load_config(&args.config)?;

    // 2. Logging.
    init_logging(&config.logging);
    info!("exodus-engine starting");
    if !config_found {
        info!(path = %args.config.display(), "Config file not found, using defaults");
    }
    info!(
        num_steps = config.simulation.num_steps,
        num_batches = config.simulation.num_batches,
        num_processes = config.simulation.num_processes,
        seed = config.simulation.seed,
        "Configuration loaded"
    );

    // 3. Location graph.
    let graph = input::load_graph(&config, args.graph.as_deref())?;

    // 4. Output directory and parameters.
    let out_dir = config.output.directory.clone();
    output::ensure_dir(&out_dir)?;
    if config.output.write_parameters {
        output::write_parameters(&out_dir, &config)?;
    }

    if args.time_trial {
        let rows = trial::run_time_trial(&config, &graph)?;
        output::write_json(&out_dir, "time_trial.json", &rows)?;
        info!(rows = rows.len(), "exodus-engine time trial complete");
        return Ok(());
    }

    // 5. Driver and Ctrl-C.
    let print_node_weights = config.output.print_node_weights;
    let write_agent_locations = config.output.write_agent_locations;
    let write_step_snapshots = config.output.write_step_snapshots;
    let control = RunControl::shared();
    let mut driver = SimulationDriver::new(config, graph)
        .map_err(EngineError::from)?
        .with_control(Arc::clone(&control));
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Ctrl-C received, stopping after the current step");
                control.request_stop();
            }
            Err(e) => warn!(error = %e, "failed to listen for Ctrl-C"),
        }
    });

    // 6. Run. Steps are CPU-bound, so they stay off the async workers.
    let sink_dir = out_dir.clone();
    let (summary, driver) = tokio::task::spawn_blocking(move || {
        let result = if write_step_snapshots {
            driver.run(&mut JsonSnapshotSink::new(sink_dir))
        } else {
            driver.run(&mut exodus_core::NoOpSink)
        };
        result.map(|summary| (summary, driver))
    })
    .await
    .map_err(|e| EngineError::Task {
        message: e.to_string(),
    })?
    .map_err(EngineError::from)?;

    // 7. Report.
    output::write_json(&out_dir, "summary.json", &summary)?;
    if write_agent_locations {
        output::write_agent_locations(&out_dir, driver.store())?;
    }
    output::report(&summary, print_node_weights);

    info!(
        end_reason = ?summary.end_reason,
        steps = summary.steps_completed,
        "exodus-engine shutdown complete"
    );
    Ok(())
}

/// Load configuration from `path`, falling back to defaults if absent.
///
/// Returns whether the file existed. The result is validated either way.
fn load_config(path: &Path) -> Result<(SimulationConfig, bool), EngineError> {
    let found = path.exists();
    let config = if found {
        SimulationConfig::from_file(path)?
    } else {
        SimulationConfig::parse("")?
    };
    config.validate()?;
    Ok((config, found))
}

/// Install the global subscriber. `RUST_LOG` wins over the config level.
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}
