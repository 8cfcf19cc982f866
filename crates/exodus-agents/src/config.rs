//! Configurable parameters for social links and movement decisions.
//!
//! [`SocialConfig`] and [`MovementConfig`] bundle every tunable the agent
//! layer reads. The engine builds them from `exodus-config.yaml` at start
//! and passes them by reference; nothing here changes during a run.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// How many links of one relation an agent draws.
///
/// Deserializes from a bare integer (fixed count) or a `[low, high]` pair
/// (uniform count, both bounds inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LinkCount {
    /// Exactly this many draws per agent.
    Fixed(u32),
    /// A uniformly random number of draws in `low..=high`.
    Range(u32, u32),
}

impl LinkCount {
    /// Largest count this can produce.
    pub const fn max(self) -> u32 {
        match self {
            Self::Fixed(n) => n,
            Self::Range(low, high) => {
                if low > high {
                    low
                } else {
                    high
                }
            }
        }
    }

    /// Reject ranges with `low > high`.
    pub fn validate(self, relation: &'static str) -> Result<(), AgentError> {
        match self {
            Self::Range(low, high) if low > high => {
                Err(AgentError::InvalidLinkRange { relation, low, high })
            }
            _ => Ok(()),
        }
    }

    /// Draw a count. Fixed counts consume no randomness.
    pub fn draw(self, rng: &mut impl Rng) -> u32 {
        match self {
            Self::Fixed(n) => n,
            Self::Range(low, high) => rng.random_range(low..=high.max(low)),
        }
    }
}

/// Social-link construction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialConfig {
    /// Kin draws per agent.
    #[serde(default = "default_link_count")]
    pub num_kin: LinkCount,
    /// Friend draws per agent.
    #[serde(default = "default_link_count")]
    pub num_friends: LinkCount,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            num_kin: default_link_count(),
            num_friends: default_link_count(),
        }
    }
}

impl SocialConfig {
    /// Validate both link counts.
    pub fn validate(&self) -> Result<(), AgentError> {
        self.num_kin.validate("kin")?;
        self.num_friends.validate("friend")
    }
}

const fn default_link_count() -> LinkCount {
    LinkCount::Fixed(1)
}

/// How agents in conflict zones decide to move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictMovePolicy {
    /// Any conflict forces movement; `percent_move_at_conflict` is ignored.
    #[default]
    Forced,
    /// Move with probability `percent_move_at_conflict`.
    Configured,
}

/// Movement-decision parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementConfig {
    /// Probability of moving away from a camp location.
    #[serde(default = "default_percent_move_at_camp")]
    pub percent_move_at_camp: f64,
    /// Probability of moving away from a conflict location; only consulted
    /// under [`ConflictMovePolicy::Configured`].
    #[serde(default = "default_percent_move_at_conflict")]
    pub percent_move_at_conflict: f64,
    /// Probability of moving away from any other location.
    #[serde(default = "default_percent_move_other")]
    pub percent_move_other: f64,
    /// Desirability added per kin member at a candidate location.
    #[serde(default = "default_social_weight")]
    pub kin_weight: f64,
    /// Desirability added per friend at a candidate location.
    #[serde(default = "default_social_weight")]
    pub friend_weight: f64,
    /// Conflict handling.
    #[serde(default)]
    pub conflict_move_policy: ConflictMovePolicy,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            percent_move_at_camp: default_percent_move_at_camp(),
            percent_move_at_conflict: default_percent_move_at_conflict(),
            percent_move_other: default_percent_move_other(),
            kin_weight: default_social_weight(),
            friend_weight: default_social_weight(),
            conflict_move_policy: ConflictMovePolicy::Forced,
        }
    }
}

impl MovementConfig {
    /// Check probabilities are in `[0, 1]` and weights are finite and non-negative.
    pub fn validate(&self) -> Result<(), AgentError> {
        for (field, value) in [
            ("percent_move_at_camp", self.percent_move_at_camp),
            ("percent_move_at_conflict", self.percent_move_at_conflict),
            ("percent_move_other", self.percent_move_other),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(AgentError::InvalidProbability { field, value });
            }
        }
        for (field, value) in [
            ("kin_weight", self.kin_weight),
            ("friend_weight", self.friend_weight),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(AgentError::InvalidWeight { field, value });
            }
        }
        Ok(())
    }
}

const fn default_percent_move_at_camp() -> f64 {
    0.3
}

const fn default_percent_move_at_conflict() -> f64 {
    1.0
}

const fn default_percent_move_other() -> f64 {
    0.7
}

const fn default_social_weight() -> f64 {
    0.25
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn link_count_parses_int_or_pair() {
        let fixed: Option<LinkCount> = serde_json::from_str("3").ok();
        assert_eq!(fixed, Some(LinkCount::Fixed(3)));
        let range: Option<LinkCount> = serde_json::from_str("[1, 4]").ok();
        assert_eq!(range, Some(LinkCount::Range(1, 4)));
    }

    #[test]
    fn negative_social_weight_rejected() {
        let config = MovementConfig {
            kin_weight: -2.0,
            ..MovementConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AgentError::InvalidWeight { field: "kin_weight", .. })
        ));
        let config = MovementConfig {
            friend_weight: -0.5,
            ..MovementConfig::default()
        };
        assert!(config.validate().is_err());
        let config = MovementConfig {
            kin_weight: 0.0,
            friend_weight: 0.0,
            ..MovementConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn inverted_range_rejected() {
        let config = SocialConfig {
            num_kin: LinkCount::Fixed(1),
            num_friends: LinkCount::Range(5, 2),
        };
        assert!(matches!(
            config.validate(),
            Err(AgentError::InvalidLinkRange { relation: "friend", .. })
        ));
    }

    #[test]
    fn range_draws_stay_in_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let count = LinkCount::Range(2, 4);
        for _ in 0..200 {
            let n = count.draw(&mut rng);
            assert!((2..=4).contains(&n));
        }
        assert_eq!(LinkCount::Fixed(6).draw(&mut rng), 6);
    }

    #[test]
    fn probability_out_of_range_rejected() {
        let config = MovementConfig {
            percent_move_other: 1.2,
            ..MovementConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AgentError::InvalidProbability { field: "percent_move_other", .. })
        ));
    }

    #[test]
    fn non_finite_weight_rejected() {
        let config = MovementConfig {
            kin_weight: f64::INFINITY,
            ..MovementConfig::default()
        };
        assert!(matches!(config.validate(), Err(AgentError::InvalidWeight { .. })));
    }

    #[test]
    fn defaults_match_reference_run() {
        let config = MovementConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.conflict_move_policy, ConflictMovePolicy::Forced);
        assert!((config.percent_move_other - 0.7).abs() < 1e-12);
    }
}
