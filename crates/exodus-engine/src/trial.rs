//! Step-time sweep over worker counts.
//!
//! Each row reruns the same graph from its initial state with
//! `num_batches == num_processes == workers` and reports the mean step
//! time. Seeding and snapshots are disabled so rows time movement only.

use exodus_core::{NoOpSink, SimulationConfig, SimulationDriver};
use exodus_world::LocationGraph;
use serde::Serialize;
use tracing::info;

use crate::error::EngineError;

/// One row of the sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialRow {
    /// Worker threads (and batches).
    pub workers: usize,
    /// Steps run.
    pub steps: u64,
    /// Mean wall time per step in milliseconds.
    pub average_step_ms: f64,
}

/// Time `trial.num_steps` steps for every worker count in `trial.processes`.
pub fn run_time_trial(
    config: &SimulationConfig,
    graph: &LocationGraph,
) -> Result<Vec<TrialRow>, EngineError> {
    let mut rows = Vec::with_capacity(config.trial.processes.len());
    for &workers in &config.trial.processes {
        let mut row_config = config.clone();
        row_config.simulation.num_steps = config.trial.num_steps;
        row_config.simulation.num_batches = workers;
        row_config.simulation.num_processes = workers;
        row_config.seeding.seed_refs = 0;

        let mut driver = SimulationDriver::new(row_config, graph.clone())?;
        let summary = driver.run(&mut NoOpSink)?;
        info!(
            workers,
            steps = summary.steps_completed,
            average_step_ms = summary.average_step_ms,
            "Time trial row"
        );
        rows.push(TrialRow {
            workers,
            steps: summary.steps_completed,
            average_step_ms: summary.average_step_ms,
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use exodus_types::{EdgeSpec, GraphSpec, NodeSpec};

    use super::*;

    #[test]
    fn one_row_per_worker_count() {
        let spec = GraphSpec {
            nodes: vec![
                NodeSpec::new("A", 8, 1, 0, 0.2),
                NodeSpec::new("B", 4, 0, 1, 0.8),
            ],
            edges: vec![EdgeSpec::new("A", "B")],
        };
        let graph = LocationGraph::from_spec(&spec, None).unwrap_or_default();
        let mut config = SimulationConfig::default();
        config.trial.num_steps = 2;
        config.trial.processes = vec![1, 2, 3];
        let rows = run_time_trial(&config, &graph).unwrap_or_default();
        assert_eq!(rows.iter().map(|r| r.workers).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(rows.iter().all(|r| r.steps == 2 && r.average_step_ms >= 0.0));
    }
}
