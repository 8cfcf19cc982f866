//! Location graph and desirability scoring for the Exodus simulation.
//!
//! This crate models the places agents move between: locations as nodes of
//! an undirected graph, each carrying a population weight, static conflict
//! and camp counts, a static proximity score, and a composite node score
//! recomputed every step.
//!
//! # Modules
//!
//! - [`error`] -- Error types for graph operations.
//! - [`location`] -- [`LocationState`] and its derived [`NodeScores`].
//! - [`location_graph`] -- The graph: construction from a [`GraphSpec`],
//!   neighbor queries, atomic weight updates.
//! - [`proximity`] -- Proximity scores from centroids and a reference point.
//! - [`scoring`] -- Per-step normalization and node scores.
//! - [`synthetic`] -- Random test graphs for trial runs.
//!
//! [`GraphSpec`]: exodus_types::GraphSpec
//! [`LocationState`]: location::LocationState
//! [`NodeScores`]: location::NodeScores

pub mod error;
pub mod location;
pub mod location_graph;
pub mod proximity;
pub mod scoring;
pub mod synthetic;

// Re-export primary types at crate root.
pub use error::WorldError;
pub use location::{LocationState, NodeScores};
pub use location_graph::LocationGraph;
pub use scoring::{NormalizationMaxima, ScoreWeights, recompute_scores};
pub use synthetic::SyntheticGraphConfig;
