//! Micro-data sampling.

use genstar_core::{GenstarError, Population, Result};
use rand::{Rng, RngCore};

use super::Sampler;

/// Draws sample entities uniformly, with replacement.
///
/// Every drawn entity is a value copy with a fresh identity, so drawing the
/// same sample entity twice yields two distinct entities.
#[derive(Debug, Clone)]
pub struct MicroDataSampler {
    sample: Population,
}

impl MicroDataSampler {
    pub fn new(sample: Population) -> Self {
        Self { sample }
    }

    pub fn sample(&self) -> &Population {
        &self.sample
    }
}

impl Sampler for MicroDataSampler {
    fn name(&self) -> &'static str {
        "micro_data"
    }

    fn draw(&self, count: usize, rng: &mut dyn RngCore) -> Result<Population> {
        if self.sample.is_empty() {
            return Err(GenstarError::distribution("cannot draw from an empty sample"));
        }
        let entities = self.sample.entities();
        let mut population = self.sample.empty_like();
        for _ in 0..count {
            let drawn = &entities[rng.random_range(0..entities.len())];
            population.add_copy(drawn);
        }
        Ok(population)
    }
}
