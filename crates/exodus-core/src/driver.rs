//! The simulation driver: owns all run state and advances it step by step.
//!
//! # State machine
//!
//! ```text
//! Initialized -> Stepping(1) -> ... -> Stepping(n) -> Finished(reason)
//!                     \______________________________-> Failed
//! ```
//!
//! # Step order
//!
//! 1. Recompute node scores from the current weights.
//! 2. Run the batch step against the pre-step state.
//! 3. Check that seeding can succeed on top of the post-step weights.
//! 4. Commit the new agent store and weights together.
//! 5. Verify conservation.
//! 6. Seed new agents, if configured, and link them socially.
//! 7. Record the step report, then hand the weight snapshot to the sink.
//!
//! A failure in steps 1-3 leaves agents, weights, and links untouched.
//! A sink failure comes after the step is recorded, so the step still
//! counts as completed.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use exodus_agents::rng::create_rng;
use exodus_agents::{AgentError, AgentStore, SocialGraph};
use exodus_types::{LocationId, RunEndReason, RunId};
use exodus_world::{LocationGraph, WorldError, recompute_scores};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::batch::{BatchError, BatchExecutor, StepInputs};
use crate::config::{ConfigError, SimulationConfig};
use crate::conservation::{ConservationResult, verify_conservation};
use crate::operator::RunControl;
use crate::sink::{SinkError, SnapshotSink};

/// Errors that halt a run.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Configuration failed validation.
    #[error("configuration error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// A location graph operation failed.
    #[error("world error: {source}")]
    World {
        /// The underlying graph error.
        #[from]
        source: WorldError,
    },

    /// Agent or social graph setup failed.
    #[error("agent error: {source}")]
    Agent {
        /// The underlying agent error.
        #[from]
        source: AgentError,
    },

    /// A batch step failed; nothing from it was committed.
    #[error("step {step} failed: {source}")]
    Batch {
        /// The step that failed.
        step: u64,
        /// The underlying batch error.
        source: BatchError,
    },

    /// A seed node is not in the graph.
    #[error("seed node {location} is not in the location graph")]
    UnknownSeedNode {
        /// The missing location.
        location: LocationId,
    },

    /// Weights and agents disagree after a step.
    #[error("population not conserved after step {step}: {expected} agents, total weight {actual}")]
    ConservationViolated {
        /// The step that broke conservation.
        step: u64,
        /// Number of agents.
        expected: u64,
        /// Sum of location weights.
        actual: u64,
    },

    /// The snapshot sink rejected a step.
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// The driver already finished or failed.
    #[error("run is already over")]
    AlreadyFinished,
}

/// Where the driver is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DriverState {
    /// Built; no step has run.
    Initialized,
    /// The given step is the last one started.
    Stepping(u64),
    /// The run ended normally.
    Finished(RunEndReason),
    /// A step failed and the run halted.
    Failed,
}

/// Measurements of one committed step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    /// One-based step number.
    pub step: u64,
    /// Agents that relocated.
    pub moved: usize,
    /// Agents that wanted to move but had no neighbor.
    pub blocked: usize,
    /// Agents added by seeding after the step.
    pub seeded: u32,
    /// Population after seeding.
    pub population: usize,
    /// Total weight after seeding.
    pub total_weight: u64,
    /// Wall time of the whole step in milliseconds.
    pub duration_ms: f64,
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Identifier of this run.
    pub run_id: RunId,
    /// Why the run ended.
    pub end_reason: RunEndReason,
    /// Steps committed.
    pub steps_completed: u64,
    /// When the driver was built.
    pub started_at: DateTime<Utc>,
    /// When the run ended.
    pub finished_at: DateTime<Utc>,
    /// Weights before the first step.
    pub start_weights: BTreeMap<LocationId, u32>,
    /// Weights after the last committed step.
    pub end_weights: BTreeMap<LocationId, u32>,
    /// Sum of `start_weights`.
    pub total_start_weight: u64,
    /// Sum of `end_weights`.
    pub total_end_weight: u64,
    /// Mean step wall time in milliseconds; zero if no step ran.
    pub average_step_ms: f64,
    /// Every step report in order.
    pub steps: Vec<StepReport>,
}

/// Owns the graph, agents, and social links of one run.
#[derive(Debug)]
pub struct SimulationDriver {
    config: SimulationConfig,
    graph: LocationGraph,
    store: AgentStore,
    social: SocialGraph,
    executor: BatchExecutor,
    social_rng: ChaCha8Rng,
    control: Arc<RunControl>,
    state: DriverState,
    run_id: RunId,
    started_at: DateTime<Utc>,
    start_weights: BTreeMap<LocationId, u32>,
    reports: Vec<StepReport>,
}

impl SimulationDriver {
    /// Build the initial agent store and social graph from `graph`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Config`] for invalid configuration,
    /// [`DriverError::UnknownSeedNode`] for a seed node outside the graph,
    /// [`DriverError::World`] for an empty graph, and
    /// [`DriverError::Agent`] if social links cannot be drawn.
    pub fn new(config: SimulationConfig, graph: LocationGraph) -> Result<Self, DriverError> {
        config.validate()?;
        if graph.location_count() == 0 {
            return Err(WorldError::EmptyGraph.into());
        }
        if let Some(missing) = config
            .seeding
            .seed_nodes
            .iter()
            .find(|id| !graph.contains(id))
        {
            return Err(DriverError::UnknownSeedNode {
                location: missing.clone(),
            });
        }

        let store = AgentStore::from_graph(&graph);
        let mut social = SocialGraph::with_population(store.len());
        let mut social_rng = create_rng(config.simulation.seed);
        social.build(0..store.len(), &config.social, &mut social_rng)?;
        let executor = BatchExecutor::new(
            config.simulation.num_batches,
            config.simulation.num_processes,
        )
        .map_err(|source| DriverError::Batch { step: 0, source })?;

        let run_id = RunId::new();
        info!(
            %run_id,
            locations = graph.location_count(),
            edges = graph.edge_count(),
            agents = store.len(),
            batches = executor.batch_count(),
            workers = executor.worker_count(),
            seed = config.simulation.seed,
            "Simulation initialized"
        );

        Ok(Self {
            start_weights: graph.weights(),
            config,
            graph,
            store,
            social,
            executor,
            social_rng,
            control: RunControl::shared(),
            state: DriverState::Initialized,
            run_id,
            started_at: Utc::now(),
            reports: Vec::new(),
        })
    }

    /// Share an externally owned run control, such as one wired to Ctrl-C.
    #[must_use]
    pub fn with_control(mut self, control: Arc<RunControl>) -> Self {
        self.control = control;
        self
    }

    /// The run control checked between steps.
    pub fn control(&self) -> Arc<RunControl> {
        Arc::clone(&self.control)
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> DriverState {
        self.state
    }

    /// Number of committed steps.
    pub fn steps_completed(&self) -> u64 {
        u64::try_from(self.reports.len()).unwrap_or(u64::MAX)
    }

    /// The location graph.
    pub const fn graph(&self) -> &LocationGraph {
        &self.graph
    }

    /// The agent store.
    pub const fn store(&self) -> &AgentStore {
        &self.store
    }

    /// The social graph.
    pub const fn social(&self) -> &SocialGraph {
        &self.social
    }

    /// The run configuration.
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Run and commit a single step.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::AlreadyFinished`] after the run ended, or the
    /// error that halted this step. Any error moves the driver to
    /// [`DriverState::Failed`]. A [`DriverError::Sink`] comes after the
    /// step is committed and recorded.
    pub fn step_once(&mut self, sink: &mut dyn SnapshotSink) -> Result<StepReport, DriverError> {
        if matches!(self.state, DriverState::Finished(_) | DriverState::Failed) {
            return Err(DriverError::AlreadyFinished);
        }
        let step = self.steps_completed().saturating_add(1);
        self.state = DriverState::Stepping(step);
        let report = match self.advance(step) {
            Ok(report) => report,
            Err(e) => return Err(self.halt(step, e)),
        };
        self.reports.push(report.clone());
        if let Err(e) = sink.on_step(&report, &self.graph.snapshot(step)) {
            return Err(self.halt(step, e.into()));
        }
        Ok(report)
    }

    fn halt(&mut self, step: u64, e: DriverError) -> DriverError {
        error!(step, error = %e, "Step failed; halting run");
        self.state = DriverState::Failed;
        e
    }

    fn advance(&mut self, step: u64) -> Result<StepReport, DriverError> {
        let started = Instant::now();
        recompute_scores(&mut self.graph, &self.config.scoring.weights)?;

        let outcome = self
            .executor
            .step(&StepInputs {
                store: &self.store,
                graph: &self.graph,
                social: &self.social,
                movement: &self.config.movement,
                seed: self.config.simulation.seed,
                step,
            })
            .map_err(|source| DriverError::Batch { step, source })?;
        let seeded = self.check_seeding(&outcome.weights)?;

        self.graph.replace_weights(&outcome.weights)?;
        self.store = outcome.store;

        if let ConservationResult::Violated {
            expected, actual, ..
        } = verify_conservation(&self.graph, &self.store)
        {
            return Err(DriverError::ConservationViolated {
                step,
                expected,
                actual,
            });
        }

        self.seed_population()?;
        let report = StepReport {
            step,
            moved: outcome.moved,
            blocked: outcome.blocked,
            seeded,
            population: self.store.len(),
            total_weight: self.graph.total_weight(),
            duration_ms: started.elapsed().as_secs_f64() * 1000.0,
        };
        info!(
            step,
            moved = report.moved,
            blocked = report.blocked,
            seeded,
            total_weight = report.total_weight,
            duration_ms = report.duration_ms,
            "Step complete"
        );
        Ok(report)
    }

    /// Number of agents seeding will add on top of `weights`.
    ///
    /// Runs before anything is committed. Repeated seed nodes accumulate,
    /// so every weight the seeding pass will write is checked.
    fn check_seeding(&self, weights: &BTreeMap<LocationId, u32>) -> Result<u32, DriverError> {
        let seeding = &self.config.seeding;
        if !seeding.is_active() {
            return Ok(0);
        }
        let refs = seeding.seed_refs;
        let mut grown: BTreeMap<&LocationId, u32> = BTreeMap::new();
        let mut seeded: u32 = 0;
        for node in &seeding.seed_nodes {
            let current = grown
                .get(node)
                .or_else(|| weights.get(node))
                .copied()
                .ok_or_else(|| DriverError::UnknownSeedNode {
                    location: node.clone(),
                })?;
            let overflow = || WorldError::WeightOverflow {
                location: node.clone(),
            };
            grown.insert(node, current.checked_add(refs).ok_or_else(overflow)?);
            seeded = seeded.checked_add(refs).ok_or_else(overflow)?;
        }
        let population = usize::try_from(seeded)
            .ok()
            .and_then(|added| self.store.len().checked_add(added))
            .unwrap_or(usize::MAX);
        SocialGraph::ensure_linkable(population, &self.config.social)?;
        Ok(seeded)
    }

    /// Add `seed_refs` agents at every seed node and link the newcomers.
    ///
    /// All newcomers are appended before any links are drawn, so their
    /// partners come from the fully grown population. Callers run
    /// [`Self::check_seeding`] first.
    fn seed_population(&mut self) -> Result<(), DriverError> {
        if !self.config.seeding.is_active() {
            return Ok(());
        }
        let refs = self.config.seeding.seed_refs;
        let first_new = self.store.len();
        for node in &self.config.seeding.seed_nodes {
            self.graph.add_weight(node, refs)?;
            self.store.append(node, refs);
        }
        let new_agents: Range<usize> = first_new..self.store.len();
        self.social.grow_to(self.store.len());
        self.social
            .build(new_agents.clone(), &self.config.social, &mut self.social_rng)?;
        debug!(
            first = new_agents.start,
            end = new_agents.end,
            "Seeded agents linked"
        );
        Ok(())
    }

    /// Run until `num_steps` steps are committed or a stop is requested.
    ///
    /// # Errors
    ///
    /// Returns the first error that halts a step.
    pub fn run(&mut self, sink: &mut dyn SnapshotSink) -> Result<RunSummary, DriverError> {
        info!(
            num_steps = self.config.simulation.num_steps,
            total_weight = self.graph.total_weight(),
            "Simulation starting"
        );
        let mut reason = RunEndReason::Completed;
        while self.steps_completed() < self.config.simulation.num_steps {
            if self.control.is_stop_requested() {
                info!(steps = self.steps_completed(), "Stop requested");
                reason = RunEndReason::Stopped;
                break;
            }
            self.step_once(sink)?;
        }
        self.state = DriverState::Finished(reason);
        let summary = self.summary(reason);
        log_run_end(&summary);
        Ok(summary)
    }

    /// Summarize the run so far.
    pub fn summary(&self, end_reason: RunEndReason) -> RunSummary {
        let end_weights = self.graph.weights();
        RunSummary {
            run_id: self.run_id,
            end_reason,
            steps_completed: self.steps_completed(),
            started_at: self.started_at,
            finished_at: Utc::now(),
            total_start_weight: sum_weights(&self.start_weights),
            total_end_weight: sum_weights(&end_weights),
            start_weights: self.start_weights.clone(),
            end_weights,
            average_step_ms: average_ms(&self.reports),
            steps: self.reports.clone(),
        }
    }
}

fn sum_weights(weights: &BTreeMap<LocationId, u32>) -> u64 {
    weights.values().map(|w| u64::from(*w)).sum()
}

fn average_ms(reports: &[StepReport]) -> f64 {
    let Ok(count) = u32::try_from(reports.len()) else {
        return 0.0;
    };
    if count == 0 {
        return 0.0;
    }
    reports.iter().map(|r| r.duration_ms).sum::<f64>() / f64::from(count)
}

/// Log the end of a run.
pub fn log_run_end(summary: &RunSummary) {
    info!(
        run_id = %summary.run_id,
        reason = ?summary.end_reason,
        steps = summary.steps_completed,
        total_start_weight = summary.total_start_weight,
        total_end_weight = summary.total_end_weight,
        average_step_ms = summary.average_step_ms,
        "Simulation ended"
    );
}

#[cfg(test)]
mod tests {
    use exodus_types::{EdgeSpec, GraphSpec, NodeSpec};

    use exodus_agents::LinkCount;
    use exodus_types::WeightSnapshot;

    use super::*;
    use crate::sink::{MemorySink, NoOpSink};

    struct FailingSink;

    impl SnapshotSink for FailingSink {
        fn on_step(&mut self, _: &StepReport, _: &WeightSnapshot) -> Result<(), SinkError> {
            Err(SinkError::new("disk full"))
        }
    }

    fn path_graph() -> LocationGraph {
        let spec = GraphSpec {
            nodes: vec![
                NodeSpec::new("A", 10, 1, 0, 0.5),
                NodeSpec::new("B", 0, 0, 0, 0.5),
                NodeSpec::new("C", 0, 0, 0, 0.5),
            ],
            edges: vec![EdgeSpec::new("A", "B"), EdgeSpec::new("B", "C")],
        };
        LocationGraph::from_spec(&spec, None).unwrap_or_default()
    }

    #[test]
    fn unknown_seed_node_rejected() {
        let mut config = SimulationConfig::default();
        config.seeding.seed_refs = 3;
        config.seeding.seed_nodes = vec![LocationId::from("Q")];
        assert!(matches!(
            SimulationDriver::new(config, path_graph()),
            Err(DriverError::UnknownSeedNode { .. })
        ));
    }

    #[test]
    fn empty_graph_rejected() {
        assert!(matches!(
            SimulationDriver::new(SimulationConfig::default(), LocationGraph::new()),
            Err(DriverError::World {
                source: WorldError::EmptyGraph
            })
        ));
    }

    #[test]
    fn state_machine_runs_to_finished() {
        let mut config = SimulationConfig::default();
        config.simulation.num_steps = 3;
        let Ok(mut driver) = SimulationDriver::new(config, path_graph()) else {
            panic!("Expected driver to build");
        };
        assert_eq!(driver.state(), DriverState::Initialized);
        let mut sink = MemorySink::default();
        let summary = driver.run(&mut sink);
        assert!(summary.is_ok());
        assert_eq!(driver.state(), DriverState::Finished(RunEndReason::Completed));
        assert_eq!(sink.snapshots.len(), 3);
        assert_eq!(sink.snapshots.iter().map(|s| s.step).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(matches!(
            driver.step_once(&mut NoOpSink),
            Err(DriverError::AlreadyFinished)
        ));
    }

    #[test]
    fn stop_before_first_step() {
        let mut config = SimulationConfig::default();
        config.simulation.num_steps = 5;
        let Ok(mut driver) = SimulationDriver::new(config, path_graph()) else {
            panic!("Expected driver to build");
        };
        driver.control().request_stop();
        let summary = driver.run(&mut NoOpSink);
        assert_eq!(
            summary.map(|s| (s.end_reason, s.steps_completed)).ok(),
            Some((RunEndReason::Stopped, 0))
        );
    }

    #[test]
    fn seeding_grows_population_and_links() {
        let mut config = SimulationConfig::default();
        config.simulation.num_steps = 2;
        config.seeding.seed_refs = 4;
        config.seeding.seed_nodes = vec![LocationId::from("C")];
        let Ok(mut driver) = SimulationDriver::new(config, path_graph()) else {
            panic!("Expected driver to build");
        };
        let Ok(summary) = driver.run(&mut NoOpSink) else {
            panic!("Expected run to succeed");
        };
        assert_eq!(summary.total_start_weight, 10);
        assert_eq!(summary.total_end_weight, 18);
        assert_eq!(driver.store().len(), 18);
        assert_eq!(driver.social().population(), 18);
        assert!(driver.social().is_symmetric());
        assert!(verify_conservation(driver.graph(), driver.store()).is_balanced());
        assert!(summary.steps.iter().all(|s| s.seeded == 4));
    }

    #[test]
    fn failed_seeding_commits_nothing() {
        let spec = GraphSpec {
            nodes: vec![
                NodeSpec::new("A", 0, 0, 0, 0.5),
                NodeSpec::new("B", 0, 0, 0, 0.5),
            ],
            edges: vec![EdgeSpec::new("A", "B")],
        };
        let mut config = SimulationConfig::default();
        config.seeding.seed_refs = 1;
        config.seeding.seed_nodes = vec![LocationId::from("A")];
        let graph = LocationGraph::from_spec(&spec, None).unwrap_or_default();
        let Ok(mut driver) = SimulationDriver::new(config, graph) else {
            panic!("Expected driver to build");
        };
        assert!(matches!(
            driver.step_once(&mut NoOpSink),
            Err(DriverError::Agent {
                source: AgentError::PopulationTooSmall { population: 1, .. }
            })
        ));
        assert_eq!(driver.state(), DriverState::Failed);
        assert_eq!(driver.store().len(), 0);
        assert_eq!(driver.graph().total_weight(), 0);
        assert_eq!(driver.social().population(), 0);
        assert_eq!(driver.steps_completed(), 0);
    }

    #[test]
    fn repeated_seed_node_accumulates() {
        let mut config = SimulationConfig::default();
        config.seeding.seed_refs = 2;
        config.seeding.seed_nodes = vec![LocationId::from("B"), LocationId::from("B")];
        config.social.num_kin = LinkCount::Fixed(0);
        let Ok(mut driver) = SimulationDriver::new(config, path_graph()) else {
            panic!("Expected driver to build");
        };
        let Ok(report) = driver.step_once(&mut NoOpSink) else {
            panic!("Expected step to succeed");
        };
        assert_eq!(report.seeded, 4);
        assert_eq!(report.total_weight, 14);
        assert!(verify_conservation(driver.graph(), driver.store()).is_balanced());
    }

    #[test]
    fn sink_failure_still_counts_the_step() {
        let Ok(mut driver) = SimulationDriver::new(SimulationConfig::default(), path_graph())
        else {
            panic!("Expected driver to build");
        };
        assert!(matches!(
            driver.step_once(&mut FailingSink),
            Err(DriverError::Sink(_))
        ));
        assert_eq!(driver.steps_completed(), 1);
        assert_eq!(driver.state(), DriverState::Failed);
        assert_eq!(driver.summary(RunEndReason::Stopped).steps.len(), 1);
    }

    #[test]
    fn shared_control_stops_the_run() {
        let mut config = SimulationConfig::default();
        config.simulation.num_steps = 4;
        let control = RunControl::shared();
        let Ok(driver) = SimulationDriver::new(config, path_graph()) else {
            panic!("Expected driver to build");
        };
        let mut driver = driver.with_control(Arc::clone(&control));
        control.request_stop();
        assert!(driver.control().is_stop_requested());
        let summary = driver.run(&mut NoOpSink);
        assert_eq!(
            summary.map(|s| s.end_reason).ok(),
            Some(RunEndReason::Stopped)
        );
    }

    #[test]
    fn average_of_no_steps_is_zero() {
        assert!(average_ms(&[]).abs() < f64::EPSILON);
    }
}
