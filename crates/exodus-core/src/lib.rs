//! Run configuration, batch stepping, and orchestration for the Exodus
//! simulation.
//!
//! This crate owns the step cycle: score, decide in parallel batches,
//! merge, verify, seed. It performs no I/O beyond reading the config file;
//! snapshots leave through a [`SnapshotSink`].
//!
//! # Modules
//!
//! - [`batch`] -- Ordered partitioning and the [`BatchExecutor`].
//! - [`config`] -- Configuration loading from `exodus-config.yaml` into
//!   strongly-typed structs.
//! - [`conservation`] -- Weight versus agent-count verification.
//! - [`driver`] -- The [`SimulationDriver`] state machine.
//! - [`operator`] -- Shared stop flag ([`RunControl`]).
//! - [`sink`] -- The [`SnapshotSink`] trait and simple sinks.
//!
//! [`BatchExecutor`]: batch::BatchExecutor
//! [`SimulationDriver`]: driver::SimulationDriver
//! [`RunControl`]: operator::RunControl
//! [`SnapshotSink`]: sink::SnapshotSink

pub mod batch;
pub mod config;
pub mod conservation;
pub mod driver;
pub mod operator;
pub mod sink;

pub use batch::{BatchError, BatchExecutor, StepOutcome, partition};
pub use config::{ConfigError, SimulationConfig};
pub use driver::{DriverError, DriverState, RunSummary, SimulationDriver, StepReport};
pub use operator::RunControl;
pub use sink::{MemorySink, NoOpSink, SinkError, SnapshotSink};
