//! Hierarchical sampling.

use genstar_core::{AttributeDictionary, GenstarError, Population, Result};
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution as _;
use rand::RngCore;

use super::Sampler;
use crate::distribution::Distribution;

/// Draws one dimension after the other, each from its marginal conditional
/// on the values already drawn.
#[derive(Debug, Clone)]
pub struct HierarchicalSampler {
    distribution: Distribution,
    attributes: AttributeDictionary,
}

impl HierarchicalSampler {
    pub fn new(distribution: Distribution, attributes: AttributeDictionary) -> Self {
        Self {
            distribution,
            attributes,
        }
    }

    fn draw_cell(&self, rng: &mut dyn RngCore) -> Result<Vec<usize>> {
        let dimensions = self.distribution.dimensions();
        let mut candidates: Vec<(&Vec<usize>, f64)> = self
            .distribution
            .cells()
            .iter()
            .map(|(c, p)| (c, *p))
            .collect();
        let mut drawn = Vec::with_capacity(dimensions.len());

        for (d, attribute) in dimensions.iter().enumerate() {
            let mut weights = vec![0.0; attribute.values().len()];
            for (coord, p) in &candidates {
                weights[coord[d]] += p;
            }
            let index = WeightedIndex::new(&weights).map_err(|e| {
                GenstarError::distribution(format!(
                    "no conditional mass left for '{}': {e}",
                    attribute.name()
                ))
            })?;
            let value = index.sample(rng);
            candidates.retain(|(coord, _)| coord[d] == value);
            drawn.push(value);
        }
        Ok(drawn)
    }
}

impl Sampler for HierarchicalSampler {
    fn name(&self) -> &'static str {
        "hierarchical"
    }

    fn draw(&self, count: usize, rng: &mut dyn RngCore) -> Result<Population> {
        let mut population = Population::new(self.attributes.clone());
        for _ in 0..count {
            let coord = self.draw_cell(rng)?;
            let mut values = self.distribution.values_of(&coord);
            self.attributes.derive_mapped(&mut values);
            population.spawn(values);
        }
        Ok(population)
    }
}
