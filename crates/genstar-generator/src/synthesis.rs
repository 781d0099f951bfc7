//! Statistical synthesis of the raw population.
//!
//! [`SynthesisOrchestrator`] runs one pass of
//! `LoadInputs -> BuildDistribution | RetrieveSample -> SelectSampler -> Materialize -> Done`
//! for the algorithm of a request. The handler for each algorithm is looked up
//! in [`HANDLERS`]; an algorithm without a handler is not implemented.

use std::fmt;

use genstar_core::{AttributeDictionary, ConfigurationError, GenstarError, Population, Result};
use rand::RngCore;
use tracing::{debug, trace};

use crate::algorithm::{Algorithm, AlgorithmFamily, AlgorithmId};
use crate::distribution::{DistributionCollapser, TableCollapser};
use crate::input::{CsvSurveyLoader, DataTable, SurveyLoader, SurveyType};
use crate::request::GenerationRequest;
use crate::sampler::{
    DirectSampler, HierarchicalSampler, IpfFitter, MicroDataSampler, MultilevelSampler,
    MultilevelSearchSampler, Objective, Sampler,
};
use crate::size::{resolve_size, TargetSize};

/// Step of a synthesis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisState {
    LoadInputs,
    BuildDistribution,
    RetrieveSample,
    SelectSampler,
    Materialize,
    Done,
    Failed,
}

impl fmt::Display for SynthesisState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SynthesisState::LoadInputs => "load_inputs",
            SynthesisState::BuildDistribution => "build_distribution",
            SynthesisState::RetrieveSample => "retrieve_sample",
            SynthesisState::SelectSampler => "select_sampler",
            SynthesisState::Materialize => "materialize",
            SynthesisState::Done => "done",
            SynthesisState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks the state of one run.
#[derive(Debug)]
pub struct SynthesisRun {
    algorithm: AlgorithmId,
    state: SynthesisState,
    history: Vec<SynthesisState>,
}

impl SynthesisRun {
    fn new(algorithm: AlgorithmId) -> Self {
        Self {
            algorithm,
            state: SynthesisState::LoadInputs,
            history: vec![SynthesisState::LoadInputs],
        }
    }

    pub fn state(&self) -> SynthesisState {
        self.state
    }

    /// Every state entered, in order.
    pub fn history(&self) -> &[SynthesisState] {
        &self.history
    }

    fn advance(&mut self, next: SynthesisState) {
        trace!(
            event = "synthesis_state",
            algorithm = self.algorithm.name(),
            from = %self.state,
            to = %next,
        );
        self.state = next;
        self.history.push(next);
    }
}

/// Produces the raw population of one algorithm.
pub type Handler = fn(
    &SynthesisOrchestrator,
    &mut SynthesisRun,
    &GenerationRequest,
    i64,
    &mut dyn RngCore,
) -> Result<Population>;

/// Handlers by algorithm. Tabu search, simulated annealing, combinatorial
/// random search and mixtures have none.
pub const HANDLERS: &[(AlgorithmId, Handler)] = &[
    (
        AlgorithmId::new(AlgorithmFamily::SyntheticReconstruction, Algorithm::DirectSampling),
        SynthesisOrchestrator::synthetic_reconstruction,
    ),
    (
        AlgorithmId::new(AlgorithmFamily::SyntheticReconstruction, Algorithm::HierarchicalSampling),
        SynthesisOrchestrator::synthetic_reconstruction,
    ),
    (
        AlgorithmId::new(AlgorithmFamily::CombinatorialOptimization, Algorithm::UniformSampling),
        SynthesisOrchestrator::combinatorial_optimization,
    ),
    (
        AlgorithmId::new(AlgorithmFamily::Multilevel, Algorithm::UniformSampling),
        SynthesisOrchestrator::multilevel,
    ),
    (
        AlgorithmId::new(AlgorithmFamily::Multilevel, Algorithm::RandomSearch),
        SynthesisOrchestrator::multilevel,
    ),
];

/// Looks up the handler of an algorithm.
pub fn handler_for(algorithm: AlgorithmId) -> Option<Handler> {
    HANDLERS
        .iter()
        .find(|(id, _)| *id == algorithm)
        .map(|(_, handler)| *handler)
}

/// Drives survey loading, distribution collapsing and sampling.
pub struct SynthesisOrchestrator {
    loader: Box<dyn SurveyLoader>,
    collapser: Box<dyn DistributionCollapser>,
    ipf: IpfFitter,
}

impl Default for SynthesisOrchestrator {
    fn default() -> Self {
        Self {
            loader: Box::new(CsvSurveyLoader::new()),
            collapser: Box::new(TableCollapser::new()),
            ipf: IpfFitter::new(),
        }
    }
}

impl fmt::Debug for SynthesisOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthesisOrchestrator")
            .field("ipf", &self.ipf)
            .finish_non_exhaustive()
    }
}

impl SynthesisOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loader(mut self, loader: impl SurveyLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    pub fn with_collapser(mut self, collapser: impl DistributionCollapser + 'static) -> Self {
        self.collapser = Box::new(collapser);
        self
    }

    pub fn with_ipf(mut self, ipf: IpfFitter) -> Self {
        self.ipf = ipf;
        self
    }

    /// Synthesizes the raw population of `request`.
    ///
    /// `requested` is the caller's size; non positive means unspecified.
    pub fn synthesize(
        &self,
        request: &GenerationRequest,
        requested: i64,
        rng: &mut dyn RngCore,
    ) -> Result<Population> {
        self.run(request, requested, rng).1
    }

    /// Like [`synthesize`](Self::synthesize), also returning the run's state
    /// history.
    pub fn run(
        &self,
        request: &GenerationRequest,
        requested: i64,
        rng: &mut dyn RngCore,
    ) -> (SynthesisRun, Result<Population>) {
        let algorithm = request.algorithm();
        let mut run = SynthesisRun::new(algorithm);
        let result = match handler_for(algorithm) {
            Some(handler) => handler(self, &mut run, request, requested, rng),
            None => Err(GenstarError::not_implemented(format!(
                "{} is not available for {} generation",
                algorithm.name(),
                algorithm.family
            ))),
        };
        match &result {
            Ok(population) => {
                run.advance(SynthesisState::Done);
                debug!(
                    event = "synthesis_done",
                    algorithm = algorithm.name(),
                    entities = population.len(),
                );
            }
            Err(err) => {
                run.advance(SynthesisState::Failed);
                debug!(
                    event = "synthesis_failed",
                    algorithm = algorithm.name(),
                    error = %err,
                );
            }
        }
        (run, result)
    }

    fn synthetic_reconstruction(
        &self,
        run: &mut SynthesisRun,
        request: &GenerationRequest,
        requested: i64,
        rng: &mut dyn RngCore,
    ) -> Result<Population> {
        let attributes = request.attributes();
        let tables = self.loader.load_tables(request.input_files(), attributes)?;

        run.advance(SynthesisState::BuildDistribution);
        let distribution = self.collapser.collapse(&tables, attributes)?;

        run.advance(SynthesisState::SelectSampler);
        let sampler: Box<dyn Sampler> = match request.algorithm().algorithm {
            Algorithm::HierarchicalSampling => {
                Box::new(HierarchicalSampler::new(distribution, attributes.clone()))
            }
            _ if request.uses_ipf() => {
                let seed = self.first_sample(request)?;
                let fitted = self.ipf.fit(&distribution, &seed)?;
                Box::new(DirectSampler::new(fitted, attributes.clone())?)
            }
            _ => Box::new(DirectSampler::new(distribution, attributes.clone())?),
        };

        let totals: Vec<f64> = tables
            .iter()
            .filter(|t| t.survey_type == SurveyType::ContingencyTable)
            .map(DataTable::total)
            .collect();
        let size = resolve_size(requested, AlgorithmFamily::SyntheticReconstruction, &totals)
            .exact()
            .unwrap_or(1);
        debug!(
            event = "sampler_selected",
            sampler = sampler.name(),
            ipf = request.uses_ipf(),
            size = size,
        );

        run.advance(SynthesisState::Materialize);
        sampler.draw(size, rng)
    }

    fn combinatorial_optimization(
        &self,
        run: &mut SynthesisRun,
        request: &GenerationRequest,
        requested: i64,
        rng: &mut dyn RngCore,
    ) -> Result<Population> {
        run.advance(SynthesisState::RetrieveSample);
        let sample = self.first_sample(request)?;

        run.advance(SynthesisState::SelectSampler);
        match resolve_size(requested, AlgorithmFamily::CombinatorialOptimization, &[]) {
            TargetSize::AsSample => {
                debug!(event = "sampler_selected", sampler = "as_sample", size = sample.len());
                Ok(sample)
            }
            TargetSize::Exact(size) => {
                let sampler = MicroDataSampler::new(sample);
                debug!(event = "sampler_selected", sampler = sampler.name(), size = size);
                run.advance(SynthesisState::Materialize);
                sampler.draw(size, rng)
            }
        }
    }

    fn multilevel(
        &self,
        run: &mut SynthesisRun,
        request: &GenerationRequest,
        requested: i64,
        rng: &mut dyn RngCore,
    ) -> Result<Population> {
        let households = request.household_attributes().ok_or_else(|| {
            ConfigurationError::Invalid("multilevel generation needs household attributes".into())
        })?;
        let key = request.household_key().ok_or_else(|| {
            ConfigurationError::Invalid("multilevel generation needs a household key".into())
        })?;
        let dictionary = merged_dictionary(households, request.attributes())?;
        let tables = self.loader.load_tables(request.input_files(), &dictionary)?;

        run.advance(SynthesisState::RetrieveSample);
        let sample = self
            .loader
            .load_multilayer_samples(request.input_files(), households, request.attributes(), key)?
            .into_iter()
            .next()
            .ok_or_else(|| ConfigurationError::MissingSample(request.algorithm_name().into()))?;
        let objectives = objectives(&tables, request, &dictionary, households)?;

        run.advance(SynthesisState::SelectSampler);
        let algorithm = request.algorithm().algorithm;
        let target = match resolve_size(requested, AlgorithmFamily::Multilevel, &[]) {
            TargetSize::Exact(n) => Some(n),
            // search needs a target; fall back on the first objective
            TargetSize::AsSample if algorithm == Algorithm::RandomSearch => objectives
                .first()
                .map(|o| o.total().round() as usize)
                .filter(|&n| n > 0),
            TargetSize::AsSample => None,
        };
        let Some(target) = target else {
            debug!(
                event = "sampler_selected",
                sampler = "as_sample",
                size = sample.len(),
                objectives = objectives.len(),
            );
            return Ok(sample);
        };

        let sampler: Box<dyn Sampler> = match algorithm {
            Algorithm::RandomSearch => {
                let params = request.co_search();
                let tolerance = target as f64 * params.fitness_threshold;
                Box::new(MultilevelSearchSampler::new(sample, objectives, params, tolerance))
            }
            _ => Box::new(MultilevelSampler::new(sample)),
        };
        debug!(event = "sampler_selected", sampler = sampler.name(), size = target);

        run.advance(SynthesisState::Materialize);
        sampler.draw(target, rng)
    }

    fn first_sample(&self, request: &GenerationRequest) -> Result<Population> {
        self.loader
            .load_samples(request.input_files(), request.attributes())?
            .into_iter()
            .next()
            .ok_or_else(|| ConfigurationError::MissingSample(request.algorithm_name().into()).into())
    }
}

/// Household attributes followed by individual attributes, records last.
fn merged_dictionary(
    households: &AttributeDictionary,
    individuals: &AttributeDictionary,
) -> Result<AttributeDictionary> {
    let mut merged = AttributeDictionary::new();
    for attribute in households.attributes().chain(individuals.attributes()) {
        merged.add(attribute.clone())?;
    }
    for record in households.records().chain(individuals.records()) {
        merged.add(record.clone())?;
    }
    Ok(merged)
}

/// One objective per table, over the dimensions that are marginals or
/// linked to one. Tables with no such dimension are skipped.
fn objectives(
    tables: &[DataTable],
    request: &GenerationRequest,
    dictionary: &AttributeDictionary,
    households: &AttributeDictionary,
) -> Result<Vec<Objective>> {
    let marginals: Vec<_> = request
        .marginals()
        .iter()
        .filter_map(|name| dictionary.get(name))
        .collect();
    let mut objectives = Vec::new();
    for table in tables {
        let keep: Vec<usize> = table
            .dimensions
            .iter()
            .enumerate()
            .filter(|(_, dimension)| {
                dictionary.get(dimension).is_some_and(|attribute| {
                    marginals
                        .iter()
                        .any(|m| m.name() == attribute.name() || m.is_linked(attribute))
                })
            })
            .map(|(i, _)| i)
            .collect();
        if keep.is_empty() {
            debug!(
                event = "table_skipped",
                source = %table.source.display(),
                reason = "no marginal dimension",
            );
            continue;
        }
        objectives.push(Objective::from_table(table, &keep, request.attributes(), households)?);
    }
    Ok(objectives)
}

#[cfg(test)]
#[path = "synthesis_tests.rs"]
mod tests;
