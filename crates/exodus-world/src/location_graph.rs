//! Location graph: locations as nodes, undirected unweighted adjacency.
//!
//! The [`LocationGraph`] is the spatial backbone of the simulation. The
//! topology is fixed once built; only location weights and derived scores
//! change during a run.
//!
//! Internally an adjacency map indexes neighbors per location:
//! `BTreeMap<LocationId, BTreeSet<LocationId>>`. Both maps iterate in
//! ascending id order, which is the reproducible order the movement policy
//! uses for tie-breaking.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use exodus_types::{GraphSpec, LocationId, WeightSnapshot};
use tracing::debug;

use crate::error::WorldError;
use crate::location::LocationState;
use crate::proximity;

/// Shared empty neighbor set returned for isolates and unknown ids.
static NO_NEIGHBORS: BTreeSet<LocationId> = BTreeSet::new();

/// The location graph holding all locations and their adjacency.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct LocationGraph {
    /// All locations indexed by their identifier.
    locations: BTreeMap<LocationId, LocationState>,
    /// Undirected adjacency: location -> neighbor set.
    adjacency: BTreeMap<LocationId, BTreeSet<LocationId>>,
}

impl LocationGraph {
    /// Create an empty location graph.
    pub const fn new() -> Self {
        Self {
            locations: BTreeMap::new(),
            adjacency: BTreeMap::new(),
        }
    }

    /// Build a graph from the collaborator's adjacency + attribute input.
    ///
    /// Nodes without a `location_score` get one derived from their
    /// `centroid` relative to `reference` (see [`proximity`]); nodes with
    /// neither default to 0.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::EmptyGraph`] for a spec with no nodes,
    /// [`WorldError::DuplicateLocation`], [`WorldError::SelfLoop`],
    /// [`WorldError::LocationNotFound`] for dangling edges, or
    /// [`WorldError::InvalidLocationScore`].
    pub fn from_spec(spec: &GraphSpec, reference: Option<(f64, f64)>) -> Result<Self, WorldError> {
        if spec.nodes.is_empty() {
            return Err(WorldError::EmptyGraph);
        }

        let derived = reference.map_or_else(BTreeMap::new, |point| {
            let centroids: BTreeMap<LocationId, [f64; 2]> = spec
                .nodes
                .iter()
                .filter_map(|n| n.centroid.map(|c| (n.id.clone(), c)))
                .collect();
            proximity::proximity_scores(&centroids, point)
        });

        let mut graph = Self::new();
        for node in &spec.nodes {
            let score = node
                .location_score
                .or_else(|| derived.get(&node.id).copied())
                .unwrap_or(0.0);
            graph.add_location(LocationState::from_spec(node, score)?)?;
        }
        for edge in &spec.edges {
            graph.add_edge(&edge.0, &edge.1)?;
        }

        debug!(
            locations = graph.location_count(),
            edges = graph.edge_count(),
            isolates = graph.isolates().len(),
            "Location graph built"
        );
        Ok(graph)
    }

    // -------------------------------------------------------------------
    // Location operations
    // -------------------------------------------------------------------

    /// Add a location to the graph.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateLocation`] if a location with the same
    /// ID already exists.
    pub fn add_location(&mut self, location: LocationState) -> Result<(), WorldError> {
        if self.locations.contains_key(&location.id) {
            return Err(WorldError::DuplicateLocation(location.id));
        }
        self.adjacency.entry(location.id.clone()).or_default();
        self.locations.insert(location.id.clone(), location);
        Ok(())
    }

    /// Get an immutable reference to a location's state.
    pub fn get(&self, id: &LocationId) -> Option<&LocationState> {
        self.locations.get(id)
    }

    /// Whether the graph contains the given location.
    pub fn contains(&self, id: &LocationId) -> bool {
        self.locations.contains_key(id)
    }

    /// Return the number of locations in the graph.
    pub fn location_count(&self) -> usize {
        self.locations.len()
    }

    /// Iterate over all locations immutably, in ascending id order.
    pub fn locations(&self) -> impl Iterator<Item = (&LocationId, &LocationState)> {
        self.locations.iter()
    }

    /// Iterate over all locations mutably, in ascending id order.
    pub fn locations_mut(&mut self) -> impl Iterator<Item = (&LocationId, &mut LocationState)> {
        self.locations.iter_mut()
    }

    // -------------------------------------------------------------------
    // Edge operations
    // -------------------------------------------------------------------

    /// Add an undirected edge. Adding an existing edge is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::SelfLoop`] when `a == b`, or
    /// [`WorldError::LocationNotFound`] if either endpoint is missing.
    pub fn add_edge(&mut self, a: &LocationId, b: &LocationId) -> Result<(), WorldError> {
        if a == b {
            return Err(WorldError::SelfLoop(a.clone()));
        }
        if !self.locations.contains_key(a) {
            return Err(WorldError::LocationNotFound(a.clone()));
        }
        if !self.locations.contains_key(b) {
            return Err(WorldError::LocationNotFound(b.clone()));
        }
        self.adjacency.entry(a.clone()).or_default().insert(b.clone());
        self.adjacency.entry(b.clone()).or_default().insert(a.clone());
        Ok(())
    }

    /// Return the number of undirected edges.
    pub fn edge_count(&self) -> usize {
        let endpoints: usize = self.adjacency.values().map(BTreeSet::len).sum();
        endpoints / 2
    }

    // -------------------------------------------------------------------
    // Graph queries
    // -------------------------------------------------------------------

    /// Neighbors of a location in ascending id order.
    ///
    /// Isolates (and unknown ids) yield an empty set, never an error.
    pub fn neighbors(&self, location: &LocationId) -> &BTreeSet<LocationId> {
        self.adjacency.get(location).unwrap_or(&NO_NEIGHBORS)
    }

    /// Locations with no neighbors.
    pub fn isolates(&self) -> Vec<LocationId> {
        self.adjacency
            .iter()
            .filter(|(_, n)| n.is_empty())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Whether every location is reachable from every other location.
    pub fn is_connected(&self) -> bool {
        let Some(start) = self.locations.keys().next() else {
            return true;
        };

        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::new();
        visited.insert(start);
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            for neighbor in self.neighbors(current) {
                if visited.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }

        visited.len() == self.locations.len()
    }

    // -------------------------------------------------------------------
    // Weights
    // -------------------------------------------------------------------

    /// Sum of all location weights.
    pub fn total_weight(&self) -> u64 {
        self.locations.values().map(|l| u64::from(l.weight)).sum()
    }

    /// Location id to current weight.
    pub fn weights(&self) -> BTreeMap<LocationId, u32> {
        self.locations
            .iter()
            .map(|(id, l)| (id.clone(), l.weight))
            .collect()
    }

    /// Capture the current weights as a snapshot for the given step.
    pub fn snapshot(&self, step: u64) -> WeightSnapshot {
        WeightSnapshot {
            step,
            weights: self.weights(),
        }
    }

    /// Compute post-step weights from signed deltas without mutating.
    ///
    /// Locations absent from `deltas` keep their weight.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::LocationNotFound`] for a delta on an unknown
    /// location, [`WorldError::WeightUnderflow`] or
    /// [`WorldError::WeightOverflow`] if a result leaves `u32` range.
    pub fn weights_after(
        &self,
        deltas: &BTreeMap<LocationId, i64>,
    ) -> Result<BTreeMap<LocationId, u32>, WorldError> {
        if let Some(unknown) = deltas.keys().find(|id| !self.locations.contains_key(*id)) {
            return Err(WorldError::LocationNotFound(unknown.clone()));
        }

        let mut result = BTreeMap::new();
        for (id, loc) in &self.locations {
            let delta = deltas.get(id).copied().unwrap_or(0);
            let updated = i64::from(loc.weight)
                .checked_add(delta)
                .ok_or_else(|| WorldError::WeightOverflow {
                    location: id.clone(),
                })?;
            if updated < 0 {
                return Err(WorldError::WeightUnderflow {
                    location: id.clone(),
                    weight: loc.weight,
                    delta,
                });
            }
            let weight = u32::try_from(updated).map_err(|_overflow| WorldError::WeightOverflow {
                location: id.clone(),
            })?;
            result.insert(id.clone(), weight);
        }
        Ok(result)
    }

    /// Replace every location's weight in one atomic update.
    ///
    /// Nothing is written unless every id in `weights` exists.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::LocationNotFound`] for an unknown id.
    pub fn replace_weights(&mut self, weights: &BTreeMap<LocationId, u32>) -> Result<(), WorldError> {
        if let Some(unknown) = weights.keys().find(|id| !self.locations.contains_key(*id)) {
            return Err(WorldError::LocationNotFound(unknown.clone()));
        }
        for (id, weight) in weights {
            if let Some(loc) = self.locations.get_mut(id) {
                loc.weight = *weight;
            }
        }
        Ok(())
    }

    /// Increase one location's weight (population seeding).
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::LocationNotFound`] or
    /// [`WorldError::WeightOverflow`].
    pub fn add_weight(&mut self, id: &LocationId, amount: u32) -> Result<u32, WorldError> {
        let loc = self
            .locations
            .get_mut(id)
            .ok_or_else(|| WorldError::LocationNotFound(id.clone()))?;
        loc.weight = loc
            .weight
            .checked_add(amount)
            .ok_or_else(|| WorldError::WeightOverflow {
                location: id.clone(),
            })?;
        Ok(loc.weight)
    }
}
