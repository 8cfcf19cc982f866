//! Input and output records exchanged with external collaborators.
//!
//! The graph-construction collaborator hands the engine a [`GraphSpec`];
//! the engine hands snapshot sinks a [`WeightSnapshot`] after every step.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::LocationId;

/// One location as supplied by the graph-construction collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Stable location identifier.
    pub id: LocationId,
    /// Number of agents initially at the location.
    #[serde(default)]
    pub weight: u32,
    /// Conflict events recorded at the location (static per run).
    #[serde(default)]
    pub num_conflicts: u32,
    /// Refugee camps at the location (static per run).
    #[serde(default)]
    pub num_camps: u32,
    /// Precomputed proximity to the reference point, in `[0, 1]`.
    ///
    /// When absent, it is derived from `centroid` if one is given.
    #[serde(default)]
    pub location_score: Option<f64>,
    /// Centroid as `[lat, lon]`, used only to derive a missing score.
    #[serde(default)]
    pub centroid: Option<[f64; 2]>,
}

impl NodeSpec {
    /// Create a node spec with explicit attributes and no centroid.
    pub fn new(
        id: impl Into<LocationId>,
        weight: u32,
        num_conflicts: u32,
        num_camps: u32,
        location_score: f64,
    ) -> Self {
        Self {
            id: id.into(),
            weight,
            num_conflicts,
            num_camps,
            location_score: Some(location_score),
            centroid: None,
        }
    }
}

/// An undirected adjacency between two locations, serialized as `[a, b]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeSpec(pub LocationId, pub LocationId);

impl EdgeSpec {
    /// Create an edge between two locations.
    pub fn new(a: impl Into<LocationId>, b: impl Into<LocationId>) -> Self {
        Self(a.into(), b.into())
    }
}

/// Abstract adjacency + attribute description of the location graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSpec {
    /// All locations.
    pub nodes: Vec<NodeSpec>,
    /// Undirected adjacency relation (no self-loops).
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
}

impl GraphSpec {
    /// Sum of initial weights across all nodes.
    pub fn total_weight(&self) -> u64 {
        self.nodes.iter().map(|n| u64::from(n.weight)).sum()
    }
}

/// Post-step population of every location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightSnapshot {
    /// Step that produced this snapshot (1-based; 0 is the initial state).
    pub step: u64,
    /// Location id to weight.
    pub weights: BTreeMap<LocationId, u32>,
}

impl WeightSnapshot {
    /// Sum of all weights.
    pub fn total(&self) -> u64 {
        self.weights.values().map(|w| u64::from(*w)).sum()
    }
}
