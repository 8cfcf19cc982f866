//! Configuration loading and typed config structures for an Exodus run.
//!
//! The canonical configuration lives in `exodus-config.yaml` at the project
//! root. Every field has a default, so an empty file (or no file at all)
//! yields the reference parameters. Component configs are passed down by
//! reference at construction; nothing reads configuration globally.

use std::path::{Path, PathBuf};

use exodus_agents::{MovementConfig, SocialConfig};
use exodus_types::LocationId;
use exodus_world::{ScoreWeights, SyntheticGraphConfig};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is outside its allowed range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level run configuration.
///
/// Mirrors the structure of `exodus-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Step count, batching, and the random seed.
    #[serde(default)]
    pub simulation: RunConfig,

    /// Kin and friend link counts.
    #[serde(default)]
    pub social: SocialConfig,

    /// Movement probabilities and social weights.
    #[serde(default)]
    pub movement: MovementConfig,

    /// Node-score weights and the proximity reference point.
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Mid-run population injection.
    #[serde(default)]
    pub seeding: SeedingConfig,

    /// Where the location graph comes from.
    #[serde(default)]
    pub input: InputConfig,

    /// Parameters of the generated test graph.
    #[serde(default)]
    pub synthetic: SyntheticGraphConfig,

    /// Files and report detail.
    #[serde(default)]
    pub output: OutputConfig,

    /// Timing sweep over worker counts.
    #[serde(default)]
    pub trial: TrialConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `EXODUS_SEED` overrides `simulation.seed` when set to an integer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.simulation.apply_env_overrides();
        Ok(config)
    }

    /// Check every value is in range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.simulation.validate()?;
        self.social
            .validate()
            .map_err(|e| invalid("social", e.to_string()))?;
        self.movement
            .validate()
            .map_err(|e| invalid("movement", e.to_string()))?;
        self.scoring.validate()?;
        self.trial.validate()?;
        if self.seeding.seed_refs > 0 && self.seeding.seed_nodes.is_empty() {
            warn!(
                seed_refs = self.seeding.seed_refs,
                "seed_refs set without seed_nodes; seeding is a no-op"
            );
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_owned(),
        reason: reason.into(),
    }
}

/// Step count, batching, and randomness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of steps to run.
    #[serde(default = "default_num_steps")]
    pub num_steps: u64,

    /// Number of ordered slices the population is split into per step.
    #[serde(default = "default_parallelism")]
    pub num_batches: usize,

    /// Number of worker threads; `1` runs batches sequentially.
    #[serde(default = "default_parallelism")]
    pub num_processes: usize,

    /// Seed for every random stream of the run.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            num_steps: default_num_steps(),
            num_batches: default_parallelism(),
            num_processes: default_parallelism(),
            seed: default_seed(),
        }
    }
}

impl RunConfig {
    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("EXODUS_SEED") {
            match val.trim().parse() {
                Ok(seed) => self.seed = seed,
                Err(_) => warn!(value = %val, "Ignoring non-integer EXODUS_SEED"),
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.num_steps == 0 {
            return Err(invalid("simulation.num_steps", "must be at least 1"));
        }
        if self.num_batches == 0 {
            return Err(invalid("simulation.num_batches", "must be at least 1"));
        }
        if self.num_processes == 0 {
            return Err(invalid("simulation.num_processes", "must be at least 1"));
        }
        Ok(())
    }
}

const fn default_num_steps() -> u64 {
    1
}

const fn default_parallelism() -> usize {
    4
}

const fn default_seed() -> u64 {
    42
}

/// A `(lat, lon)` point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferencePoint {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
}

impl Default for ReferencePoint {
    fn default() -> Self {
        Self {
            lat: 51.5074,
            lon: -0.1278,
        }
    }
}

impl ReferencePoint {
    /// As a `(lat, lon)` tuple.
    pub const fn as_tuple(self) -> (f64, f64) {
        (self.lat, self.lon)
    }
}

/// Node-score weights plus the point proximity is measured from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// The four node-score term weights.
    #[serde(flatten)]
    pub weights: ScoreWeights,

    /// Reference point for proximity scores computed from centroids.
    #[serde(default)]
    pub location: ReferencePoint,
}

impl ScoringConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.weights;
        for (field, value) in [
            ("scoring.population_weight", w.population_weight),
            ("scoring.location_weight", w.location_weight),
            ("scoring.camp_weight", w.camp_weight),
            ("scoring.conflict_weight", w.conflict_weight),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(
                    field,
                    format!("must be finite and non-negative, got {value}"),
                ));
            }
        }
        for (field, value) in [
            ("scoring.location.lat", self.location.lat),
            ("scoring.location.lon", self.location.lon),
        ] {
            if !value.is_finite() {
                return Err(invalid(field, format!("must be finite, got {value}")));
            }
        }
        Ok(())
    }
}

/// Agents injected after every step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedingConfig {
    /// Agents added at each seed node per step. `0` disables seeding.
    #[serde(default)]
    pub seed_refs: u32,

    /// Locations receiving seeded agents.
    #[serde(default)]
    pub seed_nodes: Vec<LocationId>,
}

impl SeedingConfig {
    /// Whether seeding changes anything.
    pub fn is_active(&self) -> bool {
        self.seed_refs > 0 && !self.seed_nodes.is_empty()
    }
}

/// Source of the location graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Path to a JSON graph file. When absent a synthetic graph is used.
    #[serde(default)]
    pub graph: Option<PathBuf>,
}

/// Output files and report detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct OutputConfig {
    /// Directory for every file the run writes.
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,

    /// Write `parameters.json` at start.
    #[serde(default = "default_true")]
    pub write_parameters: bool,

    /// Write `step_NNN.json` weight snapshots.
    #[serde(default)]
    pub write_step_snapshots: bool,

    /// Include per-node start and end weights in the final report.
    #[serde(default)]
    pub print_node_weights: bool,

    /// Write `agent_locations.json` at the end.
    #[serde(default)]
    pub write_agent_locations: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            write_parameters: default_true(),
            write_step_snapshots: false,
            print_node_weights: false,
            write_agent_locations: false,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

const fn default_true() -> bool {
    true
}

/// Step-time sweep over worker counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialConfig {
    /// Steps per row.
    #[serde(default = "default_trial_steps")]
    pub num_steps: u64,

    /// Worker counts to time; batches equal workers in each row.
    #[serde(default = "default_trial_processes")]
    pub processes: Vec<usize>,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            num_steps: default_trial_steps(),
            processes: default_trial_processes(),
        }
    }
}

impl TrialConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.num_steps == 0 {
            return Err(invalid("trial.num_steps", "must be at least 1"));
        }
        if self.processes.contains(&0) {
            return Err(invalid("trial.processes", "worker counts must be at least 1"));
        }
        Ok(())
    }
}

const fn default_trial_steps() -> u64 {
    5
}

fn default_trial_processes() -> Vec<usize> {
    vec![1, 2, 4, 8, 16]
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
mod tests {
    use exodus_agents::{ConflictMovePolicy, LinkCount};

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.simulation.num_steps, 1);
        assert_eq!(config.simulation.num_batches, 4);
        assert_eq!(config.trial.processes, vec![1, 2, 4, 8, 16]);
        assert!(!config.seeding.is_active());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r"
simulation:
  num_steps: 12
  num_batches: 8
  num_processes: 2
  seed: 7

social:
  num_kin: [1, 3]
  num_friends: 2

movement:
  percent_move_at_camp: 0.1
  percent_move_other: 0.0
  kin_weight: 0.5
  conflict_move_policy: configured

scoring:
  population_weight: 0.4
  location:
    lat: 36.2
    lon: 37.1

seeding:
  seed_refs: 10
  seed_nodes: [Aleppo, Idlib]

input:
  graph: graph.json

output:
  directory: runs/a
  write_step_snapshots: true

logging:
  level: debug
  json: true
";
        let config = SimulationConfig::parse(yaml).unwrap_or_default();
        assert_eq!(config.simulation.num_steps, 12);
        assert_eq!(config.social.num_kin, LinkCount::Range(1, 3));
        assert_eq!(config.social.num_friends, LinkCount::Fixed(2));
        assert_eq!(
            config.movement.conflict_move_policy,
            ConflictMovePolicy::Configured
        );
        assert!((config.movement.percent_move_at_conflict - 1.0).abs() < 1e-12);
        assert!((config.scoring.weights.population_weight - 0.4).abs() < 1e-12);
        assert!((config.scoring.weights.camp_weight - 0.25).abs() < 1e-12);
        assert!((config.scoring.location.lat - 36.2).abs() < 1e-12);
        assert!(config.seeding.is_active());
        assert_eq!(config.seeding.seed_nodes.len(), 2);
        assert_eq!(config.input.graph, Some(PathBuf::from("graph.json")));
        assert!(config.output.write_step_snapshots);
        assert!(config.output.write_parameters);
        assert!(config.logging.json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_yaml_gives_defaults() {
        let config = SimulationConfig::parse("").ok();
        assert_eq!(
            config.map(|c| c.movement),
            Some(MovementConfig::default())
        );
    }

    #[test]
    fn zero_steps_rejected() {
        let mut config = SimulationConfig::default();
        config.simulation.num_steps = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { ref field, .. }) if field == "simulation.num_steps"
        ));
    }

    #[test]
    fn bad_probability_reported_under_movement() {
        let yaml = "movement:\n  percent_move_at_camp: 1.5\n";
        let config = SimulationConfig::parse(yaml).unwrap_or_default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { ref field, .. }) if field == "movement"
        ));
    }

    #[test]
    fn negative_scoring_weight_rejected() {
        let yaml = "scoring:\n  conflict_weight: -3.0\n";
        let config = SimulationConfig::parse(yaml).unwrap_or_default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { ref field, .. }) if field == "scoring.conflict_weight"
        ));
    }

    #[test]
    fn negative_kin_weight_reported_under_movement() {
        let yaml = "movement:\n  kin_weight: -2.0\n";
        let config = SimulationConfig::parse(yaml).unwrap_or_default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { ref field, .. }) if field == "movement"
        ));
    }

    #[test]
    fn inverted_link_range_rejected() {
        let yaml = "social:\n  num_friends: [4, 1]\n";
        let config = SimulationConfig::parse(yaml).unwrap_or_default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_yaml_is_a_yaml_error() {
        let result = SimulationConfig::parse("simulation: [unclosed");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }
}
