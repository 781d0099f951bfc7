//! Built-in network topologies.

use genstar_core::{ConfigurationError, EntityId, Population, Result, SocialNetwork};
use rand::{Rng, RngCore};
use tracing::debug;

use super::{NetworkEngine, NetworkGenerator, NetworkRequest};

const DEFAULT_BETA: f64 = 0.1;
const DEFAULT_K: usize = 2;

/// Generates every [`NetworkEngine`] over the top level entities.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphGenerator;

impl GraphGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl NetworkGenerator for GraphGenerator {
    fn generate(
        &self,
        request: &NetworkRequest,
        population: &Population,
        rng: &mut dyn RngCore,
    ) -> Result<SocialNetwork> {
        request.validate()?;
        let ids: Vec<EntityId> = population.entities().iter().map(|e| e.id()).collect();
        let beta = request.beta.unwrap_or(DEFAULT_BETA);
        let k = request.k.unwrap_or(DEFAULT_K);

        let network = match request.engine {
            NetworkEngine::Random => random(&ids, beta, rng),
            NetworkEngine::Regular => ring_lattice(&ids, k),
            NetworkEngine::SmallWorld => small_world(&ids, k, beta, rng),
            NetworkEngine::ScaleFree => scale_free(&ids, k.max(1), rng),
            NetworkEngine::Complete => complete(&ids),
            NetworkEngine::Spatial => {
                if !population.is_spatialized() {
                    return Err(ConfigurationError::Invalid(format!(
                        "spatial network '{}' needs a localized population",
                        request.name
                    ))
                    .into());
                }
                spatial(population, request.beta.unwrap_or(1.0))
            }
        };
        debug!(
            event = "network_generated",
            name = %request.name,
            engine = %request.engine,
            edges = network.edge_count(),
        );
        Ok(network)
    }
}

fn random(ids: &[EntityId], p: f64, rng: &mut dyn RngCore) -> SocialNetwork {
    let mut network = SocialNetwork::with_nodes(ids.iter().copied());
    for (i, &a) in ids.iter().enumerate() {
        for &b in &ids[i + 1..] {
            if rng.random::<f64>() < p {
                network.add_edge(a, b);
            }
        }
    }
    network
}

fn lattice_edges(ids: &[EntityId], k: usize) -> Vec<(EntityId, EntityId)> {
    let n = ids.len();
    if n < 2 {
        return Vec::new();
    }
    let reach = (k / 2).min((n - 1) / 2).max(1);
    let mut edges = Vec::new();
    for i in 0..n {
        for j in 1..=reach {
            edges.push((ids[i], ids[(i + j) % n]));
        }
    }
    edges
}

fn ring_lattice(ids: &[EntityId], k: usize) -> SocialNetwork {
    let mut network = SocialNetwork::with_nodes(ids.iter().copied());
    for (a, b) in lattice_edges(ids, k) {
        network.add_edge(a, b);
    }
    network
}

fn small_world(ids: &[EntityId], k: usize, beta: f64, rng: &mut dyn RngCore) -> SocialNetwork {
    let mut network = SocialNetwork::with_nodes(ids.iter().copied());
    for (a, b) in lattice_edges(ids, k) {
        if rng.random::<f64>() < beta {
            let rewired = (0..ids.len())
                .map(|_| ids[rng.random_range(0..ids.len())])
                .find(|&c| c != a && !network.has_edge(a, c));
            if let Some(c) = rewired {
                network.add_edge(a, c);
                continue;
            }
        }
        network.add_edge(a, b);
    }
    network
}

fn scale_free(ids: &[EntityId], m: usize, rng: &mut dyn RngCore) -> SocialNetwork {
    let mut network = SocialNetwork::with_nodes(ids.iter().copied());
    let seed = (m + 1).min(ids.len());
    // every edge end once, so a uniform pick is degree proportional
    let mut ends: Vec<EntityId> = Vec::new();
    for (i, &a) in ids[..seed].iter().enumerate() {
        for &b in &ids[i + 1..seed] {
            network.add_edge(a, b);
            ends.push(a);
            ends.push(b);
        }
    }
    for &new in &ids[seed..] {
        let mut targets: Vec<EntityId> = Vec::with_capacity(m);
        while targets.len() < m.min(seed) && !ends.is_empty() {
            let target = ends[rng.random_range(0..ends.len())];
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
        for target in targets {
            network.add_edge(new, target);
            ends.push(new);
            ends.push(target);
        }
    }
    network
}

fn complete(ids: &[EntityId]) -> SocialNetwork {
    let mut network = SocialNetwork::with_nodes(ids.iter().copied());
    for (i, &a) in ids.iter().enumerate() {
        for &b in &ids[i + 1..] {
            network.add_edge(a, b);
        }
    }
    network
}

fn spatial(population: &Population, distance: f64) -> SocialNetwork {
    let located: Vec<_> = population
        .entities()
        .iter()
        .filter_map(|e| e.location().map(|p| (e.id(), p)))
        .collect();
    let mut network = SocialNetwork::with_nodes(population.entities().iter().map(|e| e.id()));
    for (i, (a, pa)) in located.iter().enumerate() {
        for (b, pb) in &located[i + 1..] {
            if pa.distance(pb) <= distance {
                network.add_edge(*a, *b);
            }
        }
    }
    network
}
