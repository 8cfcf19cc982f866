//! Shared run control.
//!
//! The driver checks the stop flag between steps, never during one, so a
//! stop request always leaves the last step fully applied. The engine
//! wires the flag to Ctrl-C; anything holding an [`Arc<RunControl>`] can
//! set it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Stop flag of a run.
#[derive(Debug)]
pub struct RunControl {
    /// Whether a stop has been requested.
    stop_requested: AtomicBool,
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new()
    }
}

impl RunControl {
    /// Create a control with no stop pending.
    pub const fn new() -> Self {
        Self {
            stop_requested: AtomicBool::new(false),
        }
    }

    /// Create a shareable control.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Request a clean stop after the current step.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_is_visible_through_clones() {
        let control = RunControl::shared();
        let handle = Arc::clone(&control);
        assert!(!control.is_stop_requested());
        handle.request_stop();
        assert!(control.is_stop_requested());
    }

    #[test]
    fn new_control_has_no_stop_pending() {
        assert!(!RunControl::default().is_stop_requested());
    }
}
