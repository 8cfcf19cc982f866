//! Agents, social ties, and movement decisions for the Exodus simulation.
//!
//! This crate is the individual layer of the model. It sits between
//! `exodus-world` (locations and their scores) and `exodus-core` (batch
//! execution and the run loop), and performs no I/O.
//!
//! # Modules
//!
//! - [`agent`] -- [`Agent`] records and the index-addressed [`AgentStore`]
//! - [`config`] -- [`SocialConfig`] and [`MovementConfig`]
//! - [`error`] -- Error types for agent operations ([`AgentError`])
//! - [`movement`] -- The per-agent [`MovementPolicy`]
//! - [`rng`] -- Deterministic run and per-agent random streams
//! - [`social`] -- Symmetric kin and friend links ([`SocialGraph`])

pub mod agent;
pub mod config;
pub mod error;
pub mod movement;
pub mod rng;
pub mod social;

// Re-export primary types at crate root for convenience.
pub use agent::{Agent, AgentStore};
pub use config::{ConflictMovePolicy, LinkCount, MovementConfig, SocialConfig};
pub use error::AgentError;
pub use movement::{Decision, MovementPolicy};
pub use social::{Relation, SocialGraph};
