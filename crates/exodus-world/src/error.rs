//! Error types for the `exodus-world` crate.
//!
//! All fallible operations in this crate return [`WorldError`] through the
//! standard [`Result`] type alias.

use exodus_types::LocationId;

/// Errors that can occur during location-graph operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The graph has no locations; scores cannot be normalized.
    #[error("location graph is empty")]
    EmptyGraph,

    /// A location was not found in the graph.
    #[error("location not found: {0}")]
    LocationNotFound(LocationId),

    /// A duplicate location was inserted where uniqueness is required.
    #[error("duplicate location id: {0}")]
    DuplicateLocation(LocationId),

    /// An edge would connect a location to itself.
    #[error("self-loop on location {0}")]
    SelfLoop(LocationId),

    /// A weight update would exceed `u32::MAX`.
    #[error("weight overflow at location {location}")]
    WeightOverflow {
        /// The location whose weight overflowed.
        location: LocationId,
    },

    /// A weight update would drive a location below zero agents.
    #[error("weight at location {location} would become negative ({weight} + {delta})")]
    WeightUnderflow {
        /// The location whose weight underflowed.
        location: LocationId,
        /// Weight before the update.
        weight: u32,
        /// Signed delta that was applied.
        delta: i64,
    },

    /// A supplied location score is outside `[0, 1]` or not finite.
    #[error("location score {score} for {location} is outside [0, 1]")]
    InvalidLocationScore {
        /// The offending location.
        location: LocationId,
        /// The rejected score.
        score: f64,
    },
}
