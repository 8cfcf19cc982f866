//! Symmetric kin and friend relations between agents.
//!
//! Relations are stored per agent as sets of [`AgentIndex`], so the graph
//! never holds references into the agent store and survives batch merges
//! unchanged. Every link is added in both directions.

use std::collections::BTreeSet;
use std::ops::Range;

use exodus_types::AgentIndex;
use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::config::{LinkCount, SocialConfig};
use crate::error::AgentError;

/// Kind of social tie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// Family member.
    Kin,
    /// Friend.
    Friend,
}

impl Relation {
    /// Lowercase name used in errors and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Kin => "kin",
            Self::Friend => "friend",
        }
    }
}

static NO_LINKS: BTreeSet<AgentIndex> = BTreeSet::new();

/// Kin and friend sets for every agent, indexed by agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SocialGraph {
    kin: Vec<BTreeSet<AgentIndex>>,
    friends: Vec<BTreeSet<AgentIndex>>,
}

impl SocialGraph {
    /// A graph of `population` agents without links.
    pub fn with_population(population: usize) -> Self {
        Self {
            kin: vec![BTreeSet::new(); population],
            friends: vec![BTreeSet::new(); population],
        }
    }

    /// Number of agents covered.
    pub const fn population(&self) -> usize {
        self.kin.len()
    }

    /// Extend coverage to `population` agents. Never shrinks.
    pub fn grow_to(&mut self, population: usize) {
        if population > self.kin.len() {
            self.kin.resize_with(population, BTreeSet::new);
            self.friends.resize_with(population, BTreeSet::new);
        }
    }

    /// Kin of an agent; empty for unknown agents.
    pub fn kin(&self, agent: AgentIndex) -> &BTreeSet<AgentIndex> {
        self.kin.get(agent.get()).unwrap_or(&NO_LINKS)
    }

    /// Friends of an agent; empty for unknown agents.
    pub fn friends(&self, agent: AgentIndex) -> &BTreeSet<AgentIndex> {
        self.friends.get(agent.get()).unwrap_or(&NO_LINKS)
    }

    /// Add a symmetric link between `a` and `b`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::SelfRelation`] if `a == b`, and
    /// [`AgentError::AgentNotFound`] if either agent is not covered.
    pub fn add_link(
        &mut self,
        relation: Relation,
        a: AgentIndex,
        b: AgentIndex,
    ) -> Result<(), AgentError> {
        if a == b {
            return Err(AgentError::SelfRelation(a));
        }
        let sets = match relation {
            Relation::Kin => &mut self.kin,
            Relation::Friend => &mut self.friends,
        };
        if b.get() >= sets.len() {
            return Err(AgentError::AgentNotFound(b));
        }
        sets.get_mut(a.get())
            .ok_or(AgentError::AgentNotFound(a))?
            .insert(b);
        if let Some(set) = sets.get_mut(b.get()) {
            set.insert(a);
        }
        Ok(())
    }

    /// Draw links for every agent in `range`.
    ///
    /// Partners come from the whole covered population, not just the
    /// range. Each agent first draws its kin, then its friends, so the
    /// random stream is consumed in a fixed order. Repeat draws of the same
    /// partner collapse into one link.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::PopulationTooSmall`] if links are requested
    /// and fewer than two agents exist, or a range error from the config.
    pub fn build(
        &mut self,
        range: Range<usize>,
        config: &SocialConfig,
        rng: &mut impl Rng,
    ) -> Result<(), AgentError> {
        config.validate()?;
        let population = self.population();
        if !range.is_empty() {
            Self::ensure_linkable(population, config)?;
        }

        let end = range.end.min(population);
        let start = range.start.min(end);
        for index in start..end {
            let agent = AgentIndex(index);
            self.draw_links(Relation::Kin, agent, config.num_kin, rng)?;
            self.draw_links(Relation::Friend, agent, config.num_friends, rng)?;
        }
        debug!(start, end, population, "Social links drawn");
        Ok(())
    }

    /// Check that `population` agents can supply the links `config` asks for.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::PopulationTooSmall`] if kin or friends are
    /// requested and fewer than two agents exist. Kin is reported first.
    pub fn ensure_linkable(population: usize, config: &SocialConfig) -> Result<(), AgentError> {
        if population >= 2 {
            return Ok(());
        }
        for (relation, count) in [
            (Relation::Kin, config.num_kin),
            (Relation::Friend, config.num_friends),
        ] {
            if count.max() > 0 {
                return Err(AgentError::PopulationTooSmall {
                    population,
                    relation: relation.as_str(),
                });
            }
        }
        Ok(())
    }

    fn draw_links(
        &mut self,
        relation: Relation,
        agent: AgentIndex,
        count: LinkCount,
        rng: &mut impl Rng,
    ) -> Result<(), AgentError> {
        let others = self.population().saturating_sub(1);
        for _ in 0..count.draw(rng) {
            let partner = skip_self(rng.random_range(0..others), agent);
            self.add_link(relation, agent, partner)?;
        }
        Ok(())
    }

    /// Whether every link has its reverse.
    pub fn is_symmetric(&self) -> bool {
        [&self.kin, &self.friends].into_iter().all(|sets| {
            sets.iter().enumerate().all(|(a, set)| {
                set.iter().all(|b| {
                    b.get() != a
                        && sets
                            .get(b.get())
                            .is_some_and(|back| back.contains(&AgentIndex(a)))
                })
            })
        })
    }

    /// Total number of undirected links of one relation.
    pub fn link_count(&self, relation: Relation) -> usize {
        let sets = match relation {
            Relation::Kin => &self.kin,
            Relation::Friend => &self.friends,
        };
        sets.iter()
            .map(BTreeSet::len)
            .sum::<usize>()
            .checked_div(2)
            .unwrap_or_default()
    }
}

/// Map a draw from `[0, N-1)` onto the `N-1` agents other than `agent`.
const fn skip_self(draw: usize, agent: AgentIndex) -> AgentIndex {
    if draw >= agent.0 {
        AgentIndex(draw.saturating_add(1))
    } else {
        AgentIndex(draw)
    }
}
