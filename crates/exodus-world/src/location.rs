//! Location node state: static attributes plus per-step derived scores.
//!
//! A [`LocationState`] holds what the graph-construction collaborator
//! supplied (conflict and camp counts, proximity score), the mutable
//! population `weight`, and the [`NodeScores`] recomputed every step by
//! [`crate::scoring::recompute_scores`].

use exodus_types::{LocationId, NodeClass, NodeSpec};
use serde::{Deserialize, Serialize};

use crate::error::WorldError;

/// Derived, per-step desirability inputs and the composite score.
///
/// All three normalized fields lie in `[0, 1]` after a recompute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeScores {
    /// `weight / max_weight`.
    pub norm_weight: f64,
    /// `num_camps / max(1, max_camps)`.
    pub norm_camps: f64,
    /// `num_conflicts / max(1, max_conflicts)`.
    pub norm_conflicts: f64,
    /// Weighted sum of the normalized inputs and the location score.
    pub node_score: f64,
}

/// Runtime state of one location in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationState {
    /// Stable identifier.
    pub id: LocationId,
    /// Number of agents currently at this location.
    pub weight: u32,
    /// Conflict events (static per run).
    pub num_conflicts: u32,
    /// Refugee camps (static per run).
    pub num_camps: u32,
    /// Proximity to the reference point, in `[0, 1]` (static per run).
    pub location_score: f64,
    /// Scores from the most recent recompute.
    pub scores: NodeScores,
}

impl LocationState {
    /// Create a location with zeroed derived scores.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidLocationScore`] if `location_score` is
    /// not a finite value in `[0, 1]`.
    pub fn new(
        id: LocationId,
        weight: u32,
        num_conflicts: u32,
        num_camps: u32,
        location_score: f64,
    ) -> Result<Self, WorldError> {
        if !location_score.is_finite() || !(0.0..=1.0).contains(&location_score) {
            return Err(WorldError::InvalidLocationScore {
                location: id,
                score: location_score,
            });
        }
        Ok(Self {
            id,
            weight,
            num_conflicts,
            num_camps,
            location_score,
            scores: NodeScores::default(),
        })
    }

    /// Build a location from its input record with a resolved score.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidLocationScore`] for an out-of-range score.
    pub fn from_spec(spec: &NodeSpec, location_score: f64) -> Result<Self, WorldError> {
        Self::new(
            spec.id.clone(),
            spec.weight,
            spec.num_conflicts,
            spec.num_camps,
            location_score,
        )
    }

    /// Movement class of this location.
    pub const fn class(&self) -> NodeClass {
        NodeClass::classify(self.num_conflicts, self.num_camps)
    }

    /// Composite score from the most recent recompute.
    pub const fn node_score(&self) -> f64 {
        self.scores.node_score
    }
}
