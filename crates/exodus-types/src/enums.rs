//! Enumeration types shared across the workspace.

use serde::{Deserialize, Serialize};

/// Movement classification of a location, checked in priority order.
///
/// Conflict outranks camps: a location with both counts as a conflict
/// zone. The class, not the node score, gates whether an agent considers
/// moving at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeClass {
    /// One or more conflict events.
    Conflict,
    /// No conflict, one or more refugee camps.
    Camp,
    /// Neither conflict nor camp.
    Other,
}

impl NodeClass {
    /// Classify a location from its conflict and camp counts.
    pub const fn classify(num_conflicts: u32, num_camps: u32) -> Self {
        if num_conflicts > 0 {
            Self::Conflict
        } else if num_camps > 0 {
            Self::Camp
        } else {
            Self::Other
        }
    }
}

/// Why a simulation run stopped stepping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEndReason {
    /// All configured steps were executed.
    Completed,
    /// A stop was requested between steps.
    Stopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_outranks_camp() {
        assert_eq!(NodeClass::classify(2, 3), NodeClass::Conflict);
        assert_eq!(NodeClass::classify(0, 1), NodeClass::Camp);
        assert_eq!(NodeClass::classify(0, 0), NodeClass::Other);
    }
}
