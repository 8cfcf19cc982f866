//! Files written by a run and the final report.
//!
//! Everything goes to `output.directory`:
//!
//! - `parameters.json` -- the effective configuration, at start
//! - `step_NNN.json` -- location weights after each step
//! - `summary.json` -- the [`RunSummary`], at the end
//! - `agent_locations.json` -- each agent's final location, if enabled

use std::path::{Path, PathBuf};

use exodus_agents::AgentStore;
use exodus_core::{RunSummary, SimulationConfig, SinkError, SnapshotSink, StepReport};
use exodus_types::WeightSnapshot;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::EngineError;

/// Create the output directory if needed.
pub fn ensure_dir(dir: &Path) -> Result<(), EngineError> {
    std::fs::create_dir_all(dir).map_err(|source| EngineError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

/// Serialize `value` as pretty JSON into `dir/name`.
pub fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<PathBuf, EngineError> {
    let path = dir.join(name);
    let json = serde_json::to_string_pretty(value).map_err(|source| EngineError::Json {
        path: path.clone(),
        source,
    })?;
    std::fs::write(&path, json).map_err(|source| EngineError::Io {
        path: path.clone(),
        source,
    })?;
    debug!(path = %path.display(), "Wrote output file");
    Ok(path)
}

/// Write the effective configuration.
pub fn write_parameters(dir: &Path, config: &SimulationConfig) -> Result<PathBuf, EngineError> {
    write_json(dir, "parameters.json", config)
}

/// One agent's final location.
#[derive(Debug, Serialize)]
struct AgentLocation<'a> {
    agent: usize,
    location: &'a str,
}

/// Write every agent's final location in index order.
pub fn write_agent_locations(dir: &Path, store: &AgentStore) -> Result<PathBuf, EngineError> {
    let rows: Vec<AgentLocation<'_>> = store
        .iter()
        .map(|a| AgentLocation {
            agent: a.index.get(),
            location: a.location.as_str(),
        })
        .collect();
    write_json(dir, "agent_locations.json", &rows)
}

/// File name of a step snapshot.
pub fn snapshot_file_name(step: u64) -> String {
    format!("step_{step:03}.json")
}

/// Writes `step_NNN.json` for every committed step.
#[derive(Debug)]
pub struct JsonSnapshotSink {
    dir: PathBuf,
}

impl JsonSnapshotSink {
    /// Write snapshots into `dir`.
    pub const fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl SnapshotSink for JsonSnapshotSink {
    fn on_step(&mut self, _report: &StepReport, snapshot: &WeightSnapshot) -> Result<(), SinkError> {
        write_json(&self.dir, &snapshot_file_name(snapshot.step), &snapshot.weights)
            .map(|_| ())
            .map_err(SinkError::new)
    }
}

/// Log the final report.
pub fn report(summary: &RunSummary, print_node_weights: bool) {
    info!(
        reason = ?summary.end_reason,
        steps = summary.steps_completed,
        total_start_weight = summary.total_start_weight,
        total_end_weight = summary.total_end_weight,
        average_step_ms = summary.average_step_ms,
        "Run report"
    );
    if print_node_weights {
        for (id, end) in &summary.end_weights {
            let start = summary.start_weights.get(id).copied().unwrap_or(0);
            info!(location = %id, start, end, "Node weight");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use exodus_types::LocationId;

    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("exodus-output-{}-{name}", std::process::id()))
    }

    #[test]
    fn snapshot_names_are_zero_padded() {
        assert_eq!(snapshot_file_name(7), "step_007.json");
        assert_eq!(snapshot_file_name(1234), "step_1234.json");
    }

    #[test]
    fn sink_writes_weight_map() {
        let dir = temp_dir("sink");
        assert!(ensure_dir(&dir).is_ok());
        let mut weights = BTreeMap::new();
        weights.insert(LocationId::from("A"), 3);
        let snapshot = WeightSnapshot { step: 2, weights };
        let report = StepReport {
            step: 2,
            moved: 0,
            blocked: 0,
            seeded: 0,
            population: 3,
            total_weight: 3,
            duration_ms: 0.5,
        };
        let mut sink = JsonSnapshotSink::new(dir.clone());
        assert!(sink.on_step(&report, &snapshot).is_ok());
        let written = std::fs::read_to_string(dir.join("step_002.json")).unwrap_or_default();
        let parsed: BTreeMap<String, u32> = serde_json::from_str(&written).unwrap_or_default();
        assert_eq!(parsed.get("A"), Some(&3));
    }

    #[test]
    fn parameters_round_trip_through_disk() {
        let dir = temp_dir("params");
        assert!(ensure_dir(&dir).is_ok());
        let config = SimulationConfig::default();
        let path = write_parameters(&dir, &config);
        assert!(path.is_ok());
        let written = std::fs::read_to_string(dir.join("parameters.json")).unwrap_or_default();
        assert!(written.contains("\"percent_move_other\": 0.7"));
    }

    #[test]
    fn sink_reports_unwritable_directory() {
        let mut sink = JsonSnapshotSink::new(PathBuf::from("/nonexistent/exodus/out"));
        let snapshot = WeightSnapshot {
            step: 1,
            weights: BTreeMap::new(),
        };
        let report = StepReport {
            step: 1,
            moved: 0,
            blocked: 0,
            seeded: 0,
            population: 0,
            total_weight: 0,
            duration_ms: 0.0,
        };
        assert!(sink.on_step(&report, &snapshot).is_err());
    }
}
