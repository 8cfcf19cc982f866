//! Per-step snapshot delivery.
//!
//! The driver hands every committed step to a [`SnapshotSink`]. The engine
//! plugs in a JSON file writer; tests use [`MemorySink`].

use exodus_types::WeightSnapshot;

use crate::driver::StepReport;

/// Receives the weight map after each committed step.
pub trait SnapshotSink: Send {
    /// Called once per committed step, after seeding.
    ///
    /// # Errors
    ///
    /// Returning an error halts the run after this step.
    fn on_step(&mut self, report: &StepReport, snapshot: &WeightSnapshot) -> Result<(), SinkError>;
}

/// A sink failure, reported back to the driver.
#[derive(Debug, thiserror::Error)]
#[error("snapshot sink failed: {message}")]
pub struct SinkError {
    /// What went wrong.
    pub message: String,
}

impl SinkError {
    /// Wrap any displayable error.
    pub fn new(message: impl std::fmt::Display) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// A sink that discards everything.
pub struct NoOpSink;

impl SnapshotSink for NoOpSink {
    fn on_step(&mut self, _report: &StepReport, _snapshot: &WeightSnapshot) -> Result<(), SinkError> {
        Ok(())
    }
}

/// A sink that keeps every snapshot in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Snapshots in step order.
    pub snapshots: Vec<WeightSnapshot>,
    /// Step reports in step order.
    pub reports: Vec<StepReport>,
}

impl SnapshotSink for MemorySink {
    fn on_step(&mut self, report: &StepReport, snapshot: &WeightSnapshot) -> Result<(), SinkError> {
        self.reports.push(report.clone());
        self.snapshots.push(snapshot.clone());
        Ok(())
    }
}
