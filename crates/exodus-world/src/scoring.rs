//! Per-step desirability scoring of every location.
//!
//! Run once per step before movement. Each location's population, camp
//! and conflict counts are normalized against the graph-wide maximum and
//! combined with its static proximity score:
//!
//! ```text
//! node_score = population_weight * norm_weight
//!            + location_weight   * location_score
//!            + camp_weight       * norm_camps
//!            - conflict_weight   * norm_conflicts
//! ```
//!
//! Every maximum is floored at 1, so an all-zero column normalizes to 0
//! instead of dividing by zero. The four weights are used as given; they
//! are not renormalized to sum to 1.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::WorldError;
use crate::location::NodeScores;
use crate::location_graph::LocationGraph;

/// Weights of the four node-score terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// Weight of the normalized population term.
    #[serde(default = "default_term_weight")]
    pub population_weight: f64,
    /// Weight of the proximity term.
    #[serde(default = "default_term_weight")]
    pub location_weight: f64,
    /// Weight of the normalized camp term.
    #[serde(default = "default_term_weight")]
    pub camp_weight: f64,
    /// Weight of the normalized conflict term (subtracted).
    #[serde(default = "default_term_weight")]
    pub conflict_weight: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            population_weight: default_term_weight(),
            location_weight: default_term_weight(),
            camp_weight: default_term_weight(),
            conflict_weight: default_term_weight(),
        }
    }
}

const fn default_term_weight() -> f64 {
    0.25
}

impl ScoreWeights {
    /// Affine combination of the normalized inputs.
    pub fn combine(
        &self,
        norm_weight: f64,
        location_score: f64,
        norm_camps: f64,
        norm_conflicts: f64,
    ) -> f64 {
        self.population_weight * norm_weight
            + self.location_weight * location_score
            + self.camp_weight * norm_camps
            - self.conflict_weight * norm_conflicts
    }
}

/// Floored maxima used by the most recent recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizationMaxima {
    /// `max(1, max weight)`.
    pub max_weight: u32,
    /// `max(1, max camps)`.
    pub max_camps: u32,
    /// `max(1, max conflicts)`.
    pub max_conflicts: u32,
}

/// Recompute normalized inputs and the node score of every location.
///
/// # Errors
///
/// Returns [`WorldError::EmptyGraph`] if the graph has no locations.
pub fn recompute_scores(
    graph: &mut LocationGraph,
    weights: &ScoreWeights,
) -> Result<NormalizationMaxima, WorldError> {
    if graph.location_count() == 0 {
        return Err(WorldError::EmptyGraph);
    }

    let mut raw_max_weight: u32 = 0;
    let mut max_camps: u32 = 1;
    let mut max_conflicts: u32 = 1;
    for (_, loc) in graph.locations() {
        raw_max_weight = raw_max_weight.max(loc.weight);
        max_camps = max_camps.max(loc.num_camps);
        max_conflicts = max_conflicts.max(loc.num_conflicts);
    }
    if raw_max_weight == 0 {
        warn!("All location weights are zero; population term floored");
    }
    let max_weight = raw_max_weight.max(1);

    for (_, loc) in graph.locations_mut() {
        let norm_weight = ratio(loc.weight, max_weight);
        let norm_camps = ratio(loc.num_camps, max_camps);
        let norm_conflicts = ratio(loc.num_conflicts, max_conflicts);
        loc.scores = NodeScores {
            norm_weight,
            norm_camps,
            norm_conflicts,
            node_score: weights.combine(norm_weight, loc.location_score, norm_camps, norm_conflicts),
        };
    }

    debug!(max_weight, max_camps, max_conflicts, "Node scores recomputed");
    Ok(NormalizationMaxima {
        max_weight,
        max_camps,
        max_conflicts,
    })
}

/// `value / max` as a float; `max` is never zero here.
fn ratio(value: u32, max: u32) -> f64 {
    f64::from(value) / f64::from(max)
}

#[cfg(test)]
mod tests {
    use exodus_types::{EdgeSpec, GraphSpec, LocationId, NodeSpec};

    use super::*;

    fn score_of(graph: &LocationGraph, name: &str) -> NodeScores {
        graph
            .get(&LocationId::from(name))
            .map(|l| l.scores)
            .unwrap_or_default()
    }

    fn graph_from(nodes: Vec<NodeSpec>) -> LocationGraph {
        let spec = GraphSpec {
            nodes,
            edges: vec![EdgeSpec::new("A", "B")],
        };
        LocationGraph::from_spec(&spec, None).unwrap_or_default()
    }

    #[test]
    fn normalizes_against_maxima() {
        let mut graph = graph_from(vec![
            NodeSpec::new("A", 10, 2, 0, 0.0),
            NodeSpec::new("B", 5, 1, 4, 1.0),
        ]);
        let maxima = recompute_scores(&mut graph, &ScoreWeights::default());
        assert_eq!(
            maxima.ok(),
            Some(NormalizationMaxima {
                max_weight: 10,
                max_camps: 4,
                max_conflicts: 2,
            })
        );

        let a = score_of(&graph, "A");
        assert!((a.norm_weight - 1.0).abs() < 1e-12);
        assert!((a.norm_conflicts - 1.0).abs() < 1e-12);
        assert!(a.norm_camps.abs() < 1e-12);
        // 0.25 * 1 + 0 + 0 - 0.25 * 1
        assert!(a.node_score.abs() < 1e-12);

        let b = score_of(&graph, "B");
        // 0.25 * 0.5 + 0.25 * 1 + 0.25 * 1 - 0.25 * 0.5
        assert!((b.node_score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn zero_population_does_not_divide_by_zero() {
        let mut graph = graph_from(vec![
            NodeSpec::new("A", 0, 0, 0, 0.5),
            NodeSpec::new("B", 0, 0, 0, 0.5),
        ]);
        let maxima = recompute_scores(&mut graph, &ScoreWeights::default());
        assert_eq!(maxima.map(|m| m.max_weight).ok(), Some(1));
        let a = score_of(&graph, "A");
        assert!(a.norm_weight.abs() < 1e-12);
        assert!(a.node_score.is_finite());
        assert!((a.node_score - 0.125).abs() < 1e-12);
    }

    #[test]
    fn normalized_values_stay_in_unit_interval() {
        let mut graph = graph_from(vec![
            NodeSpec::new("A", 7, 3, 1, 0.3),
            NodeSpec::new("B", 2, 0, 9, 0.8),
        ]);
        assert!(recompute_scores(&mut graph, &ScoreWeights::default()).is_ok());
        for (_, loc) in graph.locations() {
            for v in [loc.scores.norm_weight, loc.scores.norm_camps, loc.scores.norm_conflicts] {
                assert!((0.0..=1.0).contains(&v));
            }
        }
    }

    #[test]
    fn weights_are_not_renormalized() {
        let mut graph = graph_from(vec![
            NodeSpec::new("A", 1, 0, 0, 1.0),
            NodeSpec::new("B", 1, 0, 0, 1.0),
        ]);
        let weights = ScoreWeights {
            population_weight: 2.0,
            location_weight: 3.0,
            camp_weight: 0.0,
            conflict_weight: 0.0,
        };
        assert!(recompute_scores(&mut graph, &weights).is_ok());
        assert!((score_of(&graph, "A").node_score - 5.0).abs() < 1e-12);
    }

    #[test]
    fn empty_graph_is_an_error() {
        let mut graph = LocationGraph::new();
        assert!(matches!(
            recompute_scores(&mut graph, &ScoreWeights::default()),
            Err(WorldError::EmptyGraph)
        ));
    }
}
