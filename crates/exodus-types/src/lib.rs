//! Shared type definitions for the Exodus displacement simulation.
//!
//! # Modules
//!
//! - [`ids`] -- Location and agent identifiers, run ids
//! - [`enums`] -- Node movement classes and run end reasons
//! - [`structs`] -- Graph input records and per-step weight snapshots

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{NodeClass, RunEndReason};
pub use ids::{AgentIndex, LocationId, RunId};
pub use structs::{EdgeSpec, GraphSpec, NodeSpec, WeightSnapshot};
