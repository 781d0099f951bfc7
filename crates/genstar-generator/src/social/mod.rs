//! Social networks attached to a generated population.

mod engine;

pub use engine::GraphGenerator;

use std::fmt;

use genstar_core::{ConfigurationError, Population, Result, SocialNetwork};
use rand::RngCore;
use tracing::info;

/// Network topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkEngine {
    /// Each pair linked with probability `beta`.
    Random,
    /// Ring lattice of degree `k`.
    Regular,
    /// Ring lattice of degree `k` with edges rewired with probability `beta`.
    SmallWorld,
    /// Preferential attachment, `k` edges per new entity.
    ScaleFree,
    Complete,
    /// Localized entities within distance `beta` of each other.
    Spatial,
}

const ENGINE_ALIASES: &[(NetworkEngine, &[&str])] = &[
    (NetworkEngine::Random, &["random", "erdos_renyi", "er"]),
    (NetworkEngine::Regular, &["regular", "ring"]),
    (
        NetworkEngine::SmallWorld,
        &["small_world", "smallworld", "watts_strogatz", "ws"],
    ),
    (
        NetworkEngine::ScaleFree,
        &["scale_free", "scalefree", "barabasi_albert", "ba"],
    ),
    (NetworkEngine::Complete, &["complete", "full"]),
    (NetworkEngine::Spatial, &["spatial", "distance"]),
];

impl NetworkEngine {
    /// Resolves an engine name, ignoring case.
    pub fn resolve(name: &str) -> std::result::Result<Self, ConfigurationError> {
        let name = name.trim();
        ENGINE_ALIASES
            .iter()
            .find(|(_, aliases)| aliases.iter().any(|a| a.eq_ignore_ascii_case(name)))
            .map(|(engine, _)| *engine)
            .ok_or_else(|| ConfigurationError::UnknownNetworkEngine(name.to_string()))
    }

    /// Whether `beta` is a probability for this engine.
    pub fn beta_is_probability(&self) -> bool {
        matches!(self, NetworkEngine::Random | NetworkEngine::SmallWorld)
    }
}

impl fmt::Display for NetworkEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = ENGINE_ALIASES
            .iter()
            .find(|(engine, _)| engine == self)
            .and_then(|(_, aliases)| aliases.first())
            .copied()
            .unwrap_or("random");
        f.write_str(name)
    }
}

/// A declared network: its name, engine and parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkRequest {
    pub name: String,
    pub engine: NetworkEngine,
    pub beta: Option<f64>,
    pub k: Option<usize>,
}

impl NetworkRequest {
    /// Checks parameter ranges.
    pub fn validate(&self) -> std::result::Result<(), ConfigurationError> {
        if let Some(beta) = self.beta {
            let valid = if self.engine.beta_is_probability() {
                (0.0..=1.0).contains(&beta)
            } else {
                beta >= 0.0
            };
            if !valid {
                return Err(ConfigurationError::Invalid(format!(
                    "beta {beta} is out of range for {} network '{}'",
                    self.engine, self.name
                )));
            }
        }
        Ok(())
    }
}

/// Builds a graph over the entities of a population.
pub trait NetworkGenerator {
    fn generate(
        &self,
        request: &NetworkRequest,
        population: &Population,
        rng: &mut dyn RngCore,
    ) -> Result<SocialNetwork>;
}

/// Attaches every declared network, in declaration order.
pub struct SocializationStage {
    generator: Box<dyn NetworkGenerator>,
}

impl Default for SocializationStage {
    fn default() -> Self {
        Self {
            generator: Box::new(GraphGenerator::new()),
        }
    }
}

impl fmt::Debug for SocializationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocializationStage").finish_non_exhaustive()
    }
}

impl SocializationStage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_generator(mut self, generator: impl NetworkGenerator + 'static) -> Self {
        self.generator = Box::new(generator);
        self
    }

    pub fn run(
        &self,
        population: &mut Population,
        networks: &[NetworkRequest],
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        for request in networks {
            let network = self.generator.generate(request, population, rng)?;
            info!(
                event = "network_attached",
                name = %request.name,
                engine = %request.engine,
                nodes = network.node_count(),
                edges = network.edge_count(),
            );
            population.add_network(request.name.clone(), network);
        }
        Ok(())
    }
}
