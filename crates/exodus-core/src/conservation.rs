//! Population conservation check.
//!
//! Movement only relocates agents, so after any step without seeding:
//!
//! ```text
//! sum(weight over locations) == len(agent store)
//! weight(n) == |agents located at n|   for every location n
//! ```
//!
//! The batch merge guarantees this by construction; the check guards
//! against a merge bug silently corrupting a long run.

use std::collections::BTreeMap;

use exodus_agents::AgentStore;
use exodus_types::LocationId;
use exodus_world::LocationGraph;

/// A location whose weight disagrees with its agent count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightMismatch {
    /// The location.
    pub location: LocationId,
    /// Weight recorded on the graph.
    pub weight: u32,
    /// Agents actually located there.
    pub agents: u32,
}

/// The result of a conservation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConservationResult {
    /// Weights and agents agree.
    Balanced,
    /// Totals or per-location counts disagree.
    Violated {
        /// Number of agents in the store.
        expected: u64,
        /// Sum of location weights.
        actual: u64,
        /// Per-location disagreements, in id order.
        mismatches: Vec<WeightMismatch>,
    },
}

impl ConservationResult {
    /// Whether the check passed.
    pub const fn is_balanced(&self) -> bool {
        matches!(self, Self::Balanced)
    }
}

/// Compare graph weights against agent locations.
///
/// Agents at locations missing from the graph count as mismatches with a
/// recorded weight of zero.
pub fn verify_conservation(graph: &LocationGraph, store: &AgentStore) -> ConservationResult {
    let expected = u64::try_from(store.len()).unwrap_or(u64::MAX);
    let actual = graph.total_weight();

    let mut counts = store.counts_by_location();
    let mut mismatches = Vec::new();
    for (id, loc) in graph.locations() {
        let agents = counts.remove(id).unwrap_or(0);
        if agents != loc.weight {
            mismatches.push(WeightMismatch {
                location: id.clone(),
                weight: loc.weight,
                agents,
            });
        }
    }
    mismatches.extend(stray_agents(counts));

    if expected == actual && mismatches.is_empty() {
        ConservationResult::Balanced
    } else {
        ConservationResult::Violated {
            expected,
            actual,
            mismatches,
        }
    }
}

fn stray_agents(counts: BTreeMap<LocationId, u32>) -> impl Iterator<Item = WeightMismatch> {
    counts.into_iter().map(|(location, agents)| WeightMismatch {
        location,
        weight: 0,
        agents,
    })
}
