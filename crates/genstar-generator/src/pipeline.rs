//! The generation pipeline: synthesis, then spatialization, then
//! socialization.

use std::fmt;
use std::time::Instant;

use genstar_core::{Entity, EntityId, Population, Result};
use indexmap::IndexMap;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::materialize::EntityMaterializer;
use crate::request::GenerationRequest;
use crate::social::SocializationStage;
use crate::spatial::{CancellationToken, Interrupt, RefinementOutcome, SpatializationStage};
use crate::synthesis::SynthesisOrchestrator;

/// Random stream of one generation run.
pub type GenerationRng = ChaCha8Rng;

/// Non fatal facts about a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationReport {
    /// Entities synthesized before localization.
    pub synthesized: usize,
    /// Entities dropped because no nest admitted them.
    pub dropped: usize,
    pub refinement: RefinementOutcome,
    /// Networks attached, in declaration order.
    pub networks: Vec<String>,
}

/// A generated population and its report.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub population: Population,
    pub report: GenerationReport,
}

impl GenerationOutcome {
    pub fn materializer(&self) -> EntityMaterializer<'_> {
        EntityMaterializer::new(&self.population)
    }

    /// Pairs entities with external agents, both in order. Surplus agents or
    /// entities stay unpaired.
    pub fn associate<A>(&self, agents: impl IntoIterator<Item = A>) -> IndexMap<EntityId, A> {
        self.population
            .entities()
            .iter()
            .map(Entity::id)
            .zip(agents)
            .collect()
    }
}

/// Runs every stage of a generation, in order, on one random stream.
///
/// # Example
///
/// ```
/// use genstar_generator::pipeline::PopulationGenerator;
///
/// // nothing configured, nothing generated
/// let outcome = PopulationGenerator::new().generate(None, 100).unwrap();
/// assert!(outcome.is_none());
/// ```
#[derive(Default)]
pub struct PopulationGenerator {
    synthesis: SynthesisOrchestrator,
    spatialization: SpatializationStage,
    socialization: SocializationStage,
    cancellation: Option<CancellationToken>,
}

impl fmt::Debug for PopulationGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PopulationGenerator")
            .field("synthesis", &self.synthesis)
            .field("spatialization", &self.spatialization)
            .field("socialization", &self.socialization)
            .field("cancellation", &self.cancellation)
            .finish()
    }
}

impl PopulationGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_synthesis(mut self, synthesis: SynthesisOrchestrator) -> Self {
        self.synthesis = synthesis;
        self
    }

    pub fn with_spatialization(mut self, spatialization: SpatializationStage) -> Self {
        self.spatialization = spatialization;
        self
    }

    pub fn with_socialization(mut self, socialization: SocializationStage) -> Self {
        self.socialization = socialization;
        self
    }

    /// Token interrupting regression refinement when cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Generates a population of `size` entities.
    ///
    /// A non positive size is resolved from the inputs. Without a request
    /// nothing is generated and `None` is returned. The random stream is
    /// seeded from the request seed, or from the thread generator.
    pub fn generate(
        &self,
        request: Option<&GenerationRequest>,
        size: i64,
    ) -> Result<Option<GenerationOutcome>> {
        let Some(request) = request else {
            debug!(event = "generation_skipped", reason = "no request");
            return Ok(None);
        };
        self.generate_request(request, size).map(Some)
    }

    /// Generates from a request that is known to be present.
    pub fn generate_request(&self, request: &GenerationRequest, size: i64) -> Result<GenerationOutcome> {
        let mut rng = match request.seed() {
            Some(seed) => GenerationRng::seed_from_u64(seed),
            None => GenerationRng::from_rng(&mut rand::rng()),
        };
        self.generate_with_rng(request, size, &mut rng)
    }

    /// Generates on a caller supplied random stream.
    pub fn generate_with_rng(
        &self,
        request: &GenerationRequest,
        size: i64,
        rng: &mut dyn RngCore,
    ) -> Result<GenerationOutcome> {
        let started = Instant::now();
        info!(
            event = "generation_start",
            algorithm = request.algorithm_name(),
            requested = size,
            spatialized = request.is_spatialized(),
            social = request.is_social(),
        );

        let mut population = self.synthesis.synthesize(request, size, rng)?;
        let mut report = GenerationReport {
            synthesized: population.len(),
            ..GenerationReport::default()
        };
        info!(
            event = "synthesis_end",
            algorithm = request.algorithm_name(),
            entities = population.len(),
            duration_ms = started.elapsed().as_millis() as u64,
        );

        if let Some(spatial) = request.spatial() {
            let interrupt = match &self.cancellation {
                Some(token) => Interrupt::none().with_token(token.clone()),
                None => Interrupt::none(),
            };
            let spatial_report = self.spatialization.run(&mut population, spatial, &interrupt, rng)?;
            report.dropped = spatial_report.dropped;
            report.refinement = spatial_report.refinement;
        }

        if request.is_social() {
            self.socialization.run(&mut population, request.networks(), rng)?;
            report.networks = population.networks().map(|(name, _)| name.to_string()).collect();
        }

        info!(
            event = "generation_end",
            entities = population.len(),
            dropped = report.dropped,
            networks = report.networks.len(),
            duration_ms = started.elapsed().as_millis() as u64,
        );
        Ok(GenerationOutcome { population, report })
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
