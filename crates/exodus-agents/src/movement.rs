//! Per-agent movement decisions.
//!
//! A decision has two stages. The class of the agent's current location
//! (conflict, camp, other) sets the probability of moving at all, and one
//! uniform roll per agent settles it. An agent that moves then picks the
//! neighbor with the highest desirability:
//!
//! ```text
//! desirability(n) = kin_weight    * |kin at n|
//!                 + friend_weight * |friends at n|
//!                 + node_score(n)
//! ```
//!
//! Neighbors are visited in ascending id order and only a strictly greater
//! value replaces the current best, so ties go to the lowest id. Staying is
//! never compared: if any neighbor exists the agent moves, even to a
//! location scoring lower than its own.

use exodus_types::{AgentIndex, LocationId, NodeClass};
use exodus_world::{LocationGraph, LocationState};
use rand::Rng;

use crate::agent::{Agent, AgentStore};
use crate::config::{ConflictMovePolicy, MovementConfig};
use crate::error::AgentError;
use crate::social::SocialGraph;

/// Outcome of one agent's decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The roll said stay.
    Stay,
    /// The roll said move but the location has no neighbors.
    Blocked,
    /// Relocate between adjacent locations.
    Move {
        /// Current location.
        from: LocationId,
        /// Chosen neighbor.
        to: LocationId,
    },
}

impl Decision {
    /// Destination of a move, if any.
    pub const fn destination(&self) -> Option<&LocationId> {
        match self {
            Self::Move { to, .. } => Some(to),
            Self::Stay | Self::Blocked => None,
        }
    }
}

/// Read-only view used to decide moves for one step.
///
/// Borrows the pre-step state only, so any number of batches can share one
/// policy across threads.
#[derive(Debug, Clone, Copy)]
pub struct MovementPolicy<'a> {
    config: &'a MovementConfig,
    graph: &'a LocationGraph,
    social: &'a SocialGraph,
    store: &'a AgentStore,
}

impl<'a> MovementPolicy<'a> {
    /// Bind the policy to the current step's inputs.
    ///
    /// `graph` must already hold this step's node scores.
    pub const fn new(
        config: &'a MovementConfig,
        graph: &'a LocationGraph,
        social: &'a SocialGraph,
        store: &'a AgentStore,
    ) -> Self {
        Self {
            config,
            graph,
            social,
            store,
        }
    }

    /// Probability of leaving a location.
    pub fn move_probability(&self, location: &LocationState) -> f64 {
        match location.class() {
            NodeClass::Conflict => match self.config.conflict_move_policy {
                ConflictMovePolicy::Forced => 1.0,
                ConflictMovePolicy::Configured => self.config.percent_move_at_conflict,
            },
            NodeClass::Camp => self.config.percent_move_at_camp,
            NodeClass::Other => self.config.percent_move_other,
        }
    }

    /// Desirability of `candidate` for `agent`.
    pub fn desirability(&self, agent: &Agent, candidate: &LocationState) -> f64 {
        let kin_here = self.count_at(self.social.kin(agent.index).iter().copied(), &candidate.id);
        let friends_here =
            self.count_at(self.social.friends(agent.index).iter().copied(), &candidate.id);
        self.config.kin_weight * f64::from(kin_here)
            + self.config.friend_weight * f64::from(friends_here)
            + candidate.node_score()
    }

    /// Best neighbor of the agent's location, or `None` for an isolate.
    pub fn best_neighbor(&self, agent: &Agent) -> Option<&'a LocationId> {
        let mut best: Option<(&'a LocationId, f64)> = None;
        for neighbor in self.graph.neighbors(&agent.location) {
            let Some(state) = self.graph.get(neighbor) else {
                continue;
            };
            let score = self.desirability(agent, state);
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((neighbor, score)),
            }
        }
        best.map(|(id, _)| id)
    }

    /// Decide what `agent` does this step.
    ///
    /// Consumes exactly one `f64` from `rng`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::UnknownLocation`] if the agent's location is
    /// not in the graph.
    pub fn decide(&self, agent: &Agent, rng: &mut impl Rng) -> Result<Decision, AgentError> {
        let location = self
            .graph
            .get(&agent.location)
            .ok_or_else(|| AgentError::UnknownLocation {
                agent: agent.index,
                location: agent.location.clone(),
            })?;
        let probability = self.move_probability(location);
        let roll: f64 = rng.random();
        if roll >= probability {
            return Ok(Decision::Stay);
        }
        Ok(self
            .best_neighbor(agent)
            .map_or(Decision::Blocked, |to| Decision::Move {
                from: agent.location.clone(),
                to: to.clone(),
            }))
    }

    fn count_at(&self, related: impl Iterator<Item = AgentIndex>, at: &LocationId) -> u32 {
        let count = related
            .filter(|other| self.store.location_of(*other).is_ok_and(|loc| loc == at))
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }
}
