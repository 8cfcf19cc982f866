//! Error types for the exodus-agents crate.
//!
//! All operations that can fail return typed errors rather than panicking.
//! Configuration problems (population too small, bad ranges, bad
//! probabilities) surface here before any step runs.

use exodus_types::{AgentIndex, LocationId};

/// Errors that can occur during agent, social, or movement operations.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Social links were requested but there is no partner to draw.
    #[error("population of {population} is too small to draw {relation} partners")]
    PopulationTooSmall {
        /// Current population size.
        population: usize,
        /// Which relation was being built.
        relation: &'static str,
    },

    /// A `(low, high)` link count range with `low > high`.
    #[error("invalid {relation} count range ({low}, {high})")]
    InvalidLinkRange {
        /// Which relation the range configures.
        relation: &'static str,
        /// Lower bound.
        low: u32,
        /// Upper bound.
        high: u32,
    },

    /// A probability outside `[0, 1]` or not finite.
    #[error("{field} must be a probability in [0, 1], got {value}")]
    InvalidProbability {
        /// Config field name.
        field: &'static str,
        /// Rejected value.
        value: f64,
    },

    /// A weight that is NaN, infinite or negative.
    #[error("{field} must be finite and non-negative, got {value}")]
    InvalidWeight {
        /// Config field name.
        field: &'static str,
        /// Rejected value.
        value: f64,
    },

    /// An agent is located somewhere the graph does not know.
    #[error("agent {agent} is at unknown location {location}")]
    UnknownLocation {
        /// The agent.
        agent: AgentIndex,
        /// The unknown location.
        location: LocationId,
    },

    /// An agent index is past the end of the store.
    #[error("agent not found: {0}")]
    AgentNotFound(AgentIndex),

    /// A relation from an agent to itself.
    #[error("agent {0} cannot be related to itself")]
    SelfRelation(AgentIndex),

    /// A rebuilt store does not carry each agent at its own index.
    #[error("agent record at position {position} carries index {found}")]
    IndexMismatch {
        /// Position in the store.
        position: usize,
        /// Index recorded on the agent.
        found: AgentIndex,
    },
}
