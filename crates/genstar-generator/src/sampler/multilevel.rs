//! Multilevel sampling of households and their members.

use std::collections::BTreeMap;

use genstar_config::CoSearchParams;
use genstar_core::{AttributeDictionary, Entity, GenstarError, Population, Result};
use rand::{Rng, RngCore};
use tracing::{debug, trace};

use super::Sampler;
use crate::input::DataTable;

/// Level an objective counts at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveLevel {
    /// Counts households.
    Household,
    /// Counts members; household values fill in attributes members lack.
    Member,
}

/// A fitting target: counts over a set of marginal dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    pub dimensions: Vec<String>,
    pub level: ObjectiveLevel,
    pub counts: BTreeMap<Vec<String>, f64>,
}

impl Objective {
    /// Projects `table` onto the dimensions at `keep` (positions into the
    /// table's dimensions). The objective counts households when every kept
    /// dimension is a household attribute.
    pub fn from_table(
        table: &DataTable,
        keep: &[usize],
        attributes: &AttributeDictionary,
        households: &AttributeDictionary,
    ) -> Result<Self> {
        let dimensions: Vec<String> = keep.iter().map(|&i| table.dimensions[i].clone()).collect();
        let level = if dimensions.iter().all(|d| households.contains(d)) {
            ObjectiveLevel::Household
        } else {
            ObjectiveLevel::Member
        };

        let mut counts = BTreeMap::new();
        for (coord, count) in table.project(keep) {
            let labels = dimensions
                .iter()
                .zip(&coord)
                .map(|(name, &i)| {
                    households
                        .get(name)
                        .or_else(|| attributes.get(name))
                        .and_then(|a| a.values().get(i))
                        .map(|v| v.label())
                        .ok_or_else(|| {
                            GenstarError::distribution(format!(
                                "value {i} of '{name}' is out of range"
                            ))
                        })
                })
                .collect::<Result<Vec<String>>>()?;
            *counts.entry(labels).or_insert(0.0) += count;
        }
        Ok(Self {
            dimensions,
            level,
            counts,
        })
    }

    pub fn total(&self) -> f64 {
        self.counts.values().sum()
    }

    /// Absolute error between the objective and the given households.
    pub fn error<'a>(&self, households: impl Iterator<Item = &'a Entity>) -> f64 {
        let mut observed: BTreeMap<Vec<String>, f64> = BTreeMap::new();
        for household in households {
            match self.level {
                ObjectiveLevel::Household => {
                    if let Some(key) = self.key_of(household, None) {
                        *observed.entry(key).or_insert(0.0) += 1.0;
                    }
                }
                ObjectiveLevel::Member => {
                    for member in household.children() {
                        if let Some(key) = self.key_of(member, Some(household)) {
                            *observed.entry(key).or_insert(0.0) += 1.0;
                        }
                    }
                }
            }
        }
        let mut error: f64 = self
            .counts
            .iter()
            .map(|(key, target)| (observed.get(key).copied().unwrap_or(0.0) - target).abs())
            .sum();
        error += observed
            .iter()
            .filter(|(key, _)| !self.counts.contains_key(*key))
            .map(|(_, count)| count)
            .sum::<f64>();
        error
    }

    fn key_of(&self, entity: &Entity, parent: Option<&Entity>) -> Option<Vec<String>> {
        self.dimensions
            .iter()
            .map(|d| {
                entity
                    .value(d)
                    .or_else(|| parent.and_then(|p| p.value(d)))
                    .map(|v| v.label())
            })
            .collect()
    }
}

/// Draws households uniformly, with replacement, until the number of
/// members reaches the target.
#[derive(Debug, Clone)]
pub struct MultilevelSampler {
    sample: Population,
}

impl MultilevelSampler {
    pub fn new(sample: Population) -> Self {
        Self { sample }
    }
}

impl Sampler for MultilevelSampler {
    fn name(&self) -> &'static str {
        "multilevel"
    }

    fn draw(&self, count: usize, rng: &mut dyn RngCore) -> Result<Population> {
        let picks = draw_households(&self.sample, count, rng)?;
        Ok(materialize(&self.sample, &picks))
    }
}

/// Accepts only strictly improving moves; a lower error is better.
#[derive(Debug, Clone, Copy, Default)]
pub struct HillClimbingAcceptor;

impl HillClimbingAcceptor {
    pub fn new() -> Self {
        Self
    }

    pub fn is_accepted(&self, last_step_error: f64, move_error: f64) -> bool {
        move_error < last_step_error
    }
}

/// Hill climbing over household multisets.
///
/// Starts from a [`MultilevelSampler`] draw, then repeatedly replaces up to
/// `neighborhood_extent` households at random, keeping the change when it
/// lowers the summed error against the objectives. Stops once the error is
/// within tolerance or after `max_iterations` moves.
#[derive(Debug, Clone)]
pub struct MultilevelSearchSampler {
    sample: Population,
    objectives: Vec<Objective>,
    params: CoSearchParams,
    tolerance: f64,
    acceptor: HillClimbingAcceptor,
}

impl MultilevelSearchSampler {
    pub fn new(
        sample: Population,
        objectives: Vec<Objective>,
        params: CoSearchParams,
        tolerance: f64,
    ) -> Self {
        Self {
            sample,
            objectives,
            params,
            tolerance,
            acceptor: HillClimbingAcceptor::new(),
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    fn fitness(&self, picks: &[usize]) -> f64 {
        let households = self.sample.entities();
        self.objectives
            .iter()
            .map(|o| o.error(picks.iter().map(|&i| &households[i])))
            .sum()
    }
}

impl Sampler for MultilevelSearchSampler {
    fn name(&self) -> &'static str {
        "multilevel_search"
    }

    fn draw(&self, count: usize, rng: &mut dyn RngCore) -> Result<Population> {
        let mut picks = draw_households(&self.sample, count, rng)?;
        let mut error = self.fitness(&picks);
        let initial_error = error;
        let extent = self.params.neighborhood_extent.max(1);
        let households = self.sample.len();

        let mut step = 0;
        while step < self.params.max_iterations && error > self.tolerance && !picks.is_empty() {
            step += 1;
            let mut candidate = picks.clone();
            for _ in 0..extent.min(candidate.len()) {
                let slot = rng.random_range(0..candidate.len());
                candidate[slot] = rng.random_range(0..households);
            }
            let candidate_error = self.fitness(&candidate);
            let accepted = self.acceptor.is_accepted(error, candidate_error);
            trace!(
                event = "step",
                step = step,
                error = candidate_error,
                accepted = accepted,
            );
            if accepted {
                picks = candidate;
                error = candidate_error;
            }
        }

        debug!(
            event = "search_end",
            steps = step,
            initial_error = initial_error,
            error = error,
            tolerance = self.tolerance,
        );
        Ok(materialize(&self.sample, &picks))
    }
}

fn draw_households(sample: &Population, count: usize, rng: &mut dyn RngCore) -> Result<Vec<usize>> {
    if sample.is_empty() {
        return Err(GenstarError::distribution("cannot draw from an empty sample"));
    }
    let households = sample.entities();
    let mut picks = Vec::new();
    let mut members = 0;
    while members < count {
        let i = rng.random_range(0..households.len());
        members += households[i].size();
        picks.push(i);
    }
    Ok(picks)
}

fn materialize(sample: &Population, picks: &[usize]) -> Population {
    let mut population = sample.empty_like();
    for &i in picks {
        population.add_copy(&sample.entities()[i]);
    }
    population
}
