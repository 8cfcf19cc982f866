//! Synthetic test graphs for trial runs without real geography.
//!
//! Produces a G(n, p) random graph with `p = avg_num_neighbors / num_nodes`.
//! The population is split into `num_breaks` equal lumps, each dropped on a
//! uniformly random node. Every node gets the same conflict, camp and
//! proximity attributes. Node ids are zero-padded integers so that string
//! order matches numeric order.

use exodus_types::{EdgeSpec, GraphSpec, LocationId, NodeSpec};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Parameters of the synthetic graph generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticGraphConfig {
    /// Number of locations.
    #[serde(default = "default_num_nodes")]
    pub num_nodes: u32,
    /// Expected neighbor count per location.
    #[serde(default = "default_avg_num_neighbors")]
    pub avg_num_neighbors: f64,
    /// Total agents to distribute.
    #[serde(default = "default_total_refs")]
    pub total_refs: u32,
    /// Number of equal lumps the population is split into.
    #[serde(default = "default_num_breaks")]
    pub num_breaks: u32,
    /// Conflict count assigned to every node.
    #[serde(default = "default_num_conflicts")]
    pub num_conflicts: u32,
    /// Camp count assigned to every node.
    #[serde(default)]
    pub num_camps: u32,
    /// Proximity score assigned to every node.
    #[serde(default = "default_location_score")]
    pub location_score: f64,
}

impl Default for SyntheticGraphConfig {
    fn default() -> Self {
        Self {
            num_nodes: default_num_nodes(),
            avg_num_neighbors: default_avg_num_neighbors(),
            total_refs: default_total_refs(),
            num_breaks: default_num_breaks(),
            num_conflicts: default_num_conflicts(),
            num_camps: 0,
            location_score: default_location_score(),
        }
    }
}

const fn default_num_nodes() -> u32 {
    100
}

const fn default_avg_num_neighbors() -> f64 {
    5.0
}

const fn default_total_refs() -> u32 {
    500
}

const fn default_num_breaks() -> u32 {
    50
}

const fn default_num_conflicts() -> u32 {
    1
}

const fn default_location_score() -> f64 {
    0.5
}

/// Generate a synthetic graph spec.
///
/// Remainders of `total_refs / num_breaks` are dropped, as are all refs
/// when `num_breaks` is zero. An empty spec is returned for zero nodes.
pub fn generate(config: &SyntheticGraphConfig, rng: &mut impl Rng) -> GraphSpec {
    if config.num_nodes == 0 {
        return GraphSpec::default();
    }

    let width = config.num_nodes.to_string().len();
    let ids: Vec<LocationId> = (0..config.num_nodes)
        .map(|i| LocationId::new(format!("{i:0width$}")))
        .collect();

    let mut weights = vec![0_u32; ids.len()];
    let lump = config.total_refs.checked_div(config.num_breaks).unwrap_or(0);
    for _ in 0..config.num_breaks {
        let pick = rng.random_range(0..ids.len());
        if let Some(w) = weights.get_mut(pick) {
            *w = w.saturating_add(lump);
        }
    }

    let probability = config.avg_num_neighbors / f64::from(config.num_nodes);
    let mut edges = Vec::new();
    for (i, a) in ids.iter().enumerate() {
        for b in ids.iter().skip(i.saturating_add(1)) {
            if rng.random::<f64>() < probability {
                edges.push(EdgeSpec(a.clone(), b.clone()));
            }
        }
    }

    let nodes = ids
        .into_iter()
        .zip(weights)
        .map(|(id, weight)| NodeSpec {
            id,
            weight,
            num_conflicts: config.num_conflicts,
            num_camps: config.num_camps,
            location_score: Some(config.location_score),
            centroid: None,
        })
        .collect();

    GraphSpec { nodes, edges }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn default_graph_shape() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let spec = generate(&SyntheticGraphConfig::default(), &mut rng);
        assert_eq!(spec.nodes.len(), 100);
        assert_eq!(spec.total_weight(), 500);
        assert!(spec.nodes.iter().all(|n| n.num_conflicts == 1 && n.num_camps == 0));
        assert!(spec.edges.iter().all(|e| e.0 < e.1));
        assert_eq!(spec.nodes.first().map(|n| n.id.as_str()), Some("000"));
    }

    #[test]
    fn same_seed_same_graph() {
        let config = SyntheticGraphConfig::default();
        let a = generate(&config, &mut ChaCha8Rng::seed_from_u64(7));
        let b = generate(&config, &mut ChaCha8Rng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn zero_nodes_gives_empty_spec() {
        let config = SyntheticGraphConfig {
            num_nodes: 0,
            ..SyntheticGraphConfig::default()
        };
        let spec = generate(&config, &mut ChaCha8Rng::seed_from_u64(1));
        assert!(spec.nodes.is_empty());
    }

    #[test]
    fn remainder_refs_are_dropped() {
        let config = SyntheticGraphConfig {
            total_refs: 103,
            num_breaks: 10,
            ..SyntheticGraphConfig::default()
        };
        let spec = generate(&config, &mut ChaCha8Rng::seed_from_u64(3));
        assert_eq!(spec.total_weight(), 100);
    }
}
