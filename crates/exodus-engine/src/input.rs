//! Location graph input: a JSON graph file or a generated test graph.

use std::path::Path;

use exodus_agents::rng::create_graph_rng;
use exodus_core::SimulationConfig;
use exodus_types::GraphSpec;
use exodus_world::LocationGraph;
use exodus_world::synthetic::generate;
use tracing::{info, warn};

use crate::error::EngineError;

/// Build the run's location graph.
///
/// `override_path` takes precedence over `input.graph`. With neither, the
/// synthetic graph described by `synthetic` is generated from the run seed.
pub fn load_graph(
    config: &SimulationConfig,
    override_path: Option<&Path>,
) -> Result<LocationGraph, EngineError> {
    let path = override_path.or(config.input.graph.as_deref());
    let spec = match path {
        Some(path) => read_graph_spec(path)?,
        None => {
            info!(
                num_nodes = config.synthetic.num_nodes,
                total_refs = config.synthetic.total_refs,
                "No graph file configured, generating synthetic graph"
            );
            generate(&config.synthetic, &mut create_graph_rng(config.simulation.seed))
        }
    };

    let graph = LocationGraph::from_spec(&spec, Some(config.scoring.location.as_tuple()))?;
    let isolates = graph.isolates().len();
    if isolates > 0 {
        warn!(isolates, "Graph has locations without neighbors");
    }
    info!(
        locations = graph.location_count(),
        edges = graph.edge_count(),
        total_weight = graph.total_weight(),
        connected = graph.is_connected(),
        "Location graph loaded"
    );
    Ok(graph)
}

/// Read a [`GraphSpec`] from a JSON file.
pub fn read_graph_spec(path: &Path) -> Result<GraphSpec, EngineError> {
    let contents = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| EngineError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use exodus_types::LocationId;

    use super::*;

    fn temp_file(name: &str, contents: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("exodus-input-{}", std::process::id()));
        let _ = std::fs::create_dir_all(&dir);
        let path = dir.join(name);
        let _ = std::fs::write(&path, contents);
        path
    }

    #[test]
    fn reads_graph_with_centroids() {
        let path = temp_file(
            "graph.json",
            r#"{
                "nodes": [
                    {"id": "Aleppo", "weight": 12, "num_conflicts": 2, "centroid": [36.2, 37.1]},
                    {"id": "Gaziantep", "weight": 0, "num_camps": 3, "centroid": [37.0, 37.4]},
                    {"id": "Kilis", "weight": 1, "location_score": 0.9}
                ],
                "edges": [["Aleppo", "Gaziantep"], ["Gaziantep", "Kilis"], ["Kilis", "Gaziantep"]]
            }"#,
        );
        let config = SimulationConfig::default();
        let graph = load_graph(&config, Some(path.as_path()));
        assert!(graph.is_ok());
        let graph = graph.unwrap_or_default();
        assert_eq!(graph.location_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.total_weight(), 13);
        let kilis = graph.get(&LocationId::from("Kilis")).map(|l| l.location_score);
        assert!(kilis.is_some_and(|s| (s - 0.9).abs() < 1e-12));
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = read_graph_spec(Path::new("/nonexistent/exodus/graph.json"));
        assert!(matches!(result, Err(EngineError::Io { .. })));
    }

    #[test]
    fn malformed_json_is_json_error() {
        let path = temp_file("broken.json", "{ \"nodes\": [");
        assert!(matches!(read_graph_spec(&path), Err(EngineError::Json { .. })));
    }

    #[test]
    fn synthetic_graph_when_no_file() {
        let config = SimulationConfig::default();
        let graph = load_graph(&config, None).unwrap_or_default();
        assert_eq!(graph.location_count(), 100);
        assert_eq!(graph.total_weight(), 500);
    }
}
