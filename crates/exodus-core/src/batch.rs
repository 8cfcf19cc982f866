//! Ordered partitioning and the parallel batch step.
//!
//! A step splits the agent index range into contiguous slices, decides
//! every agent's move inside each slice without touching shared state, and
//! then merges the per-slice outputs in slice order. Slices run on a rayon
//! pool when more than one worker is configured. Every agent draws from
//! its own `(seed, step, index)` stream, so the merged result is the same
//! for any batch or worker count.

use std::collections::BTreeMap;
use std::ops::Range;

use exodus_agents::rng::derive_agent_rng;
use exodus_agents::{Agent, AgentError, AgentStore, Decision, MovementConfig, MovementPolicy, SocialGraph};
use exodus_types::{AgentIndex, LocationId};
use exodus_world::{LocationGraph, WorldError};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

/// Errors that abort a step before anything is committed.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// An agent decision failed inside a batch.
    #[error("batch {batch} failed: {source}")]
    Worker {
        /// Position of the failing batch.
        batch: usize,
        /// The underlying agent error.
        source: AgentError,
    },

    /// The worker pool could not be created.
    #[error("failed to build worker pool: {source}")]
    ThreadPool {
        /// The underlying rayon error.
        #[from]
        source: rayon::ThreadPoolBuildError,
    },

    /// Merged deltas would drive a location below zero agents.
    #[error("merged weight for {location} would go negative ({weight} {delta:+})")]
    NegativeWeight {
        /// The location.
        location: LocationId,
        /// Weight before the step.
        weight: u32,
        /// Net delta of the step.
        delta: i64,
    },

    /// Merged deltas could not be applied for another reason.
    #[error("weight merge failed: {source}")]
    Merge {
        /// The underlying graph error.
        source: WorldError,
    },

    /// The merged agent list does not line up with the pre-step store.
    #[error("merged agent list misplaces an agent at position {position} (found {found})")]
    IdentityMismatch {
        /// Position in the merged list.
        position: usize,
        /// Index recorded on the agent found there.
        found: AgentIndex,
    },
}

impl From<WorldError> for BatchError {
    fn from(source: WorldError) -> Self {
        match source {
            WorldError::WeightUnderflow {
                location,
                weight,
                delta,
            } => Self::NegativeWeight {
                location,
                weight,
                delta,
            },
            other => Self::Merge { source: other },
        }
    }
}

/// Split `0..len` into `batch_count` contiguous ordered ranges.
///
/// Ranges cover every index exactly once. Sizes differ by at most one, the
/// longer ranges first. With more batches than indices the trailing ranges
/// are empty. A `batch_count` of zero is treated as one.
pub fn partition(len: usize, batch_count: usize) -> Vec<Range<usize>> {
    let batch_count = batch_count.max(1);
    let base = len.checked_div(batch_count).unwrap_or(len);
    let remainder = len.checked_rem(batch_count).unwrap_or(0);
    let mut ranges = Vec::with_capacity(batch_count);
    let mut start = 0_usize;
    for i in 0..batch_count {
        let size = if i < remainder {
            base.saturating_add(1)
        } else {
            base
        };
        let end = start.saturating_add(size).min(len);
        ranges.push(start..end);
        start = end;
    }
    ranges
}

/// Output of one batch: new agent records and net weight changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutput {
    /// One record per agent in the slice, in index order.
    pub agents: Vec<Agent>,
    /// Net signed change per location contributed by this slice.
    pub deltas: BTreeMap<LocationId, i64>,
    /// Agents that relocated.
    pub moved: usize,
    /// Agents that wanted to move but had no neighbor.
    pub blocked: usize,
}

/// Result of a whole step, ready to be committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    /// The post-step agent store.
    pub store: AgentStore,
    /// Net change per location (zero entries omitted).
    pub deltas: BTreeMap<LocationId, i64>,
    /// Post-step weight of every location.
    pub weights: BTreeMap<LocationId, u32>,
    /// Agents that relocated.
    pub moved: usize,
    /// Agents that wanted to move but had no neighbor.
    pub blocked: usize,
}

/// Read-only inputs shared by every batch of one step.
#[derive(Debug, Clone, Copy)]
pub struct StepInputs<'a> {
    /// Pre-step agents.
    pub store: &'a AgentStore,
    /// Location graph with this step's scores.
    pub graph: &'a LocationGraph,
    /// Kin and friend links.
    pub social: &'a SocialGraph,
    /// Movement parameters.
    pub movement: &'a MovementConfig,
    /// Run seed.
    pub seed: u64,
    /// One-based step number.
    pub step: u64,
}

/// Runs steps as ordered batches on an optional worker pool.
#[derive(Debug)]
pub struct BatchExecutor {
    batch_count: usize,
    worker_count: usize,
    pool: Option<ThreadPool>,
}

impl BatchExecutor {
    /// Create an executor. A pool is only built when `worker_count > 1`.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::ThreadPool`] if rayon cannot start the pool.
    pub fn new(batch_count: usize, worker_count: usize) -> Result<Self, BatchError> {
        let pool = if worker_count > 1 {
            Some(ThreadPoolBuilder::new().num_threads(worker_count).build()?)
        } else {
            None
        };
        Ok(Self {
            batch_count: batch_count.max(1),
            worker_count: worker_count.max(1),
            pool,
        })
    }

    /// Number of batches per step.
    pub const fn batch_count(&self) -> usize {
        self.batch_count
    }

    /// Number of workers.
    pub const fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Advance every agent by one step without mutating the inputs.
    ///
    /// All batches finish before merging. Batch results are gathered in
    /// slice order, so when several batches fail the lowest-numbered one
    /// is reported, whatever the worker count.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::Worker`] for a failed decision, and
    /// [`BatchError::NegativeWeight`], [`BatchError::Merge`] or
    /// [`BatchError::IdentityMismatch`] if the merge is inconsistent.
    pub fn step(&self, inputs: &StepInputs<'_>) -> Result<StepOutcome, BatchError> {
        let policy = MovementPolicy::new(inputs.movement, inputs.graph, inputs.social, inputs.store);
        let ranges = partition(inputs.store.len(), self.batch_count);

        let run = |(batch, range): (usize, Range<usize>)| {
            run_batch(&policy, inputs, batch, range)
        };
        let results: Vec<Result<BatchOutput, BatchError>> = match &self.pool {
            Some(pool) => pool.install(|| ranges.into_par_iter().enumerate().map(run).collect()),
            None => ranges.into_iter().enumerate().map(run).collect(),
        };
        let outputs = results.into_iter().collect::<Result<Vec<_>, _>>()?;

        merge(inputs, outputs)
    }
}

fn run_batch(
    policy: &MovementPolicy<'_>,
    inputs: &StepInputs<'_>,
    batch: usize,
    range: Range<usize>,
) -> Result<BatchOutput, BatchError> {
    let mut output = BatchOutput {
        agents: Vec::with_capacity(range.len()),
        ..BatchOutput::default()
    };
    for agent in inputs.store.slice(range.clone()) {
        let mut rng = derive_agent_rng(inputs.seed, inputs.step, agent.index.get());
        let decision = policy
            .decide(agent, &mut rng)
            .map_err(|source| BatchError::Worker { batch, source })?;
        match decision {
            Decision::Move { from, to } => {
                output.agents.push(agent.relocated(to.clone()));
                add_delta(&mut output.deltas, from, -1);
                add_delta(&mut output.deltas, to, 1);
                output.moved = output.moved.saturating_add(1);
            }
            Decision::Blocked => {
                output.agents.push(agent.clone());
                output.blocked = output.blocked.saturating_add(1);
            }
            Decision::Stay => output.agents.push(agent.clone()),
        }
    }
    debug!(
        batch,
        start = range.start,
        end = range.end,
        moved = output.moved,
        "Batch complete"
    );
    Ok(output)
}

fn add_delta(deltas: &mut BTreeMap<LocationId, i64>, location: LocationId, delta: i64) {
    let entry = deltas.entry(location).or_insert(0);
    *entry = entry.saturating_add(delta);
}

/// Concatenate batch outputs in slice order and apply the summed deltas.
fn merge(inputs: &StepInputs<'_>, outputs: Vec<BatchOutput>) -> Result<StepOutcome, BatchError> {
    let mut agents = Vec::with_capacity(inputs.store.len());
    let mut deltas: BTreeMap<LocationId, i64> = BTreeMap::new();
    let mut moved = 0_usize;
    let mut blocked = 0_usize;
    for output in outputs {
        agents.extend(output.agents);
        for (location, delta) in output.deltas {
            add_delta(&mut deltas, location, delta);
        }
        moved = moved.saturating_add(output.moved);
        blocked = blocked.saturating_add(output.blocked);
    }
    deltas.retain(|_, delta| *delta != 0);

    if agents.len() != inputs.store.len() {
        let position = agents.len().min(inputs.store.len());
        return Err(BatchError::IdentityMismatch {
            position,
            found: AgentIndex(agents.len()),
        });
    }
    let store = AgentStore::from_agents(agents).map_err(|e| match e {
        AgentError::IndexMismatch { position, found } => {
            BatchError::IdentityMismatch { position, found }
        }
        other => BatchError::Worker {
            batch: 0,
            source: other,
        },
    })?;
    let weights = inputs.graph.weights_after(&deltas)?;

    Ok(StepOutcome {
        store,
        deltas,
        weights,
        moved,
        blocked,
    })
}
