//! Agent records and the indexed agent store.
//!
//! Agents are identified by their position in the store. The store only
//! grows: seeding appends new agents at the end, and a step replaces the
//! whole vector with one that carries every agent at its original index.

use std::collections::BTreeMap;
use std::ops::Range;

use exodus_types::{AgentIndex, LocationId};
use exodus_world::LocationGraph;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// A single displaced person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    /// Position in the [`AgentStore`].
    pub index: AgentIndex,
    /// Where the agent currently is.
    pub location: LocationId,
}

impl Agent {
    /// Create an agent at a location.
    pub const fn new(index: AgentIndex, location: LocationId) -> Self {
        Self { index, location }
    }

    /// Copy of this agent relocated to `location`.
    #[must_use]
    pub fn relocated(&self, location: LocationId) -> Self {
        Self {
            index: self.index,
            location,
        }
    }
}

/// All agents of a run, indexed by [`AgentIndex`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AgentStore {
    agents: Vec<Agent>,
}

impl AgentStore {
    /// Create an empty store.
    pub const fn new() -> Self {
        Self { agents: Vec::new() }
    }

    /// Populate from initial location weights.
    ///
    /// Each location contributes `weight` agents, visited in ascending
    /// location id order.
    pub fn from_graph(graph: &LocationGraph) -> Self {
        let mut store = Self::new();
        for (id, loc) in graph.locations() {
            store.append(id, loc.weight);
        }
        store
    }

    /// Rebuild a store from agent records.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::IndexMismatch`] if any record is not at the
    /// position matching its own index.
    pub fn from_agents(agents: Vec<Agent>) -> Result<Self, AgentError> {
        if let Some((position, agent)) = agents
            .iter()
            .enumerate()
            .find(|(position, agent)| agent.index.get() != *position)
        {
            return Err(AgentError::IndexMismatch {
                position,
                found: agent.index,
            });
        }
        Ok(Self { agents })
    }

    /// Number of agents.
    pub const fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether the store is empty.
    pub const fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Agent at an index.
    pub fn get(&self, index: AgentIndex) -> Option<&Agent> {
        self.agents.get(index.get())
    }

    /// Location of an agent.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::AgentNotFound`] for an index past the end.
    pub fn location_of(&self, index: AgentIndex) -> Result<&LocationId, AgentError> {
        self.get(index)
            .map(|a| &a.location)
            .ok_or(AgentError::AgentNotFound(index))
    }

    /// Iterate agents in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter()
    }

    /// A contiguous slice of agents. Out-of-range bounds are clamped.
    pub fn slice(&self, range: Range<usize>) -> &[Agent] {
        let end = range.end.min(self.agents.len());
        let start = range.start.min(end);
        self.agents.get(start..end).unwrap_or_default()
    }

    /// Append `count` agents at `location`; returns their index range.
    pub fn append(&mut self, location: &LocationId, count: u32) -> Range<usize> {
        let start = self.agents.len();
        for _ in 0..count {
            let index = AgentIndex(self.agents.len());
            self.agents.push(Agent::new(index, location.clone()));
        }
        start..self.agents.len()
    }

    /// Number of agents per location. Locations without agents are absent.
    pub fn counts_by_location(&self) -> BTreeMap<LocationId, u32> {
        let mut counts: BTreeMap<LocationId, u32> = BTreeMap::new();
        for agent in &self.agents {
            let entry = counts.entry(agent.location.clone()).or_default();
            *entry = entry.saturating_add(1);
        }
        counts
    }

    /// Consume the store into its records.
    pub fn into_vec(self) -> Vec<Agent> {
        self.agents
    }
}

#[cfg(test)]
mod tests {
    use exodus_types::{EdgeSpec, GraphSpec, NodeSpec};

    use super::*;

    fn graph() -> LocationGraph {
        let spec = GraphSpec {
            nodes: vec![
                NodeSpec::new("B", 1, 0, 0, 0.5),
                NodeSpec::new("A", 2, 0, 0, 0.5),
            ],
            edges: vec![EdgeSpec::new("A", "B")],
        };
        LocationGraph::from_spec(&spec, None).unwrap_or_default()
    }

    #[test]
    fn from_graph_orders_by_location_id() {
        let store = AgentStore::from_graph(&graph());
        assert_eq!(store.len(), 3);
        let locations: Vec<&str> = store.iter().map(|a| a.location.as_str()).collect();
        assert_eq!(locations, vec!["A", "A", "B"]);
        assert!(store.iter().enumerate().all(|(i, a)| a.index.get() == i));
    }

    #[test]
    fn counts_match_weights() {
        let graph = graph();
        let store = AgentStore::from_graph(&graph);
        assert_eq!(store.counts_by_location(), graph.weights());
    }

    #[test]
    fn append_extends_index_range() {
        let mut store = AgentStore::from_graph(&graph());
        let range = store.append(&LocationId::from("B"), 4);
        assert_eq!(range, 3..7);
        assert_eq!(store.len(), 7);
        assert_eq!(
            store.location_of(AgentIndex(6)).map(LocationId::as_str).ok(),
            Some("B")
        );
    }

    #[test]
    fn from_agents_rejects_misplaced_index() {
        let agents = vec![
            Agent::new(AgentIndex(0), LocationId::from("A")),
            Agent::new(AgentIndex(2), LocationId::from("A")),
        ];
        assert!(matches!(
            AgentStore::from_agents(agents),
            Err(AgentError::IndexMismatch { position: 1, .. })
        ));
    }

    #[test]
    fn slice_clamps_bounds() {
        let store = AgentStore::from_graph(&graph());
        assert_eq!(store.slice(1..10).len(), 2);
        assert!(store.slice(5..9).is_empty());
        assert!(matches!(
            store.location_of(AgentIndex(3)),
            Err(AgentError::AgentNotFound(_))
        ));
    }
}
