//! Direct sampling over a joint distribution.

use genstar_core::{AttributeDictionary, GenstarError, Population, Result};
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution as _;
use rand::RngCore;

use super::Sampler;
use crate::distribution::Distribution;

/// Draws whole cells of a joint distribution, weighted by probability.
#[derive(Debug, Clone)]
pub struct DirectSampler {
    distribution: Distribution,
    attributes: AttributeDictionary,
    coords: Vec<Vec<usize>>,
    index: WeightedIndex<f64>,
}

impl DirectSampler {
    /// Creates a sampler producing entities described by `attributes`.
    pub fn new(distribution: Distribution, attributes: AttributeDictionary) -> Result<Self> {
        let (coords, weights): (Vec<Vec<usize>>, Vec<f64>) = distribution
            .cells()
            .iter()
            .map(|(c, p)| (c.clone(), *p))
            .unzip();
        let index = WeightedIndex::new(weights)
            .map_err(|e| GenstarError::distribution(format!("cannot sample distribution: {e}")))?;
        Ok(Self {
            distribution,
            attributes,
            coords,
            index,
        })
    }

    pub fn distribution(&self) -> &Distribution {
        &self.distribution
    }
}

impl Sampler for DirectSampler {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn draw(&self, count: usize, rng: &mut dyn RngCore) -> Result<Population> {
        let mut population = Population::new(self.attributes.clone());
        for _ in 0..count {
            let coord = &self.coords[self.index.sample(rng)];
            let mut values = self.distribution.values_of(coord);
            self.attributes.derive_mapped(&mut values);
            population.spawn(values);
        }
        Ok(population)
    }
}
