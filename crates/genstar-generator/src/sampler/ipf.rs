//! Iterative proportional fitting.

use std::collections::BTreeMap;

use genstar_core::{GenstarError, Population, Result};
use tracing::debug;

use crate::distribution::Distribution;

/// Maximum number of fitting cycles.
pub const IPF_MAX_ITERATIONS: usize = 100;

/// Convergence threshold on the largest cell change of a cycle.
pub const IPF_DELTA: f64 = 1e-4;

/// Fits the cell frequencies of a seed sample onto the one dimensional
/// marginals of a distribution.
///
/// The fitted distribution keeps the seed's support: cells absent from the
/// seed stay empty.
#[derive(Debug, Clone, Copy)]
pub struct IpfFitter {
    max_iterations: usize,
    delta: f64,
}

impl Default for IpfFitter {
    fn default() -> Self {
        Self {
            max_iterations: IPF_MAX_ITERATIONS,
            delta: IPF_DELTA,
        }
    }
}

impl IpfFitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn fit(&self, distribution: &Distribution, seed: &Population) -> Result<Distribution> {
        let dimensions = distribution.dimensions();
        let mut cells: BTreeMap<Vec<usize>, f64> = BTreeMap::new();
        for entity in seed.entities() {
            let coord: Option<Vec<usize>> = dimensions
                .iter()
                .map(|a| entity.value(a.name()).and_then(|v| a.index_of(&v.label())))
                .collect();
            if let Some(coord) = coord {
                *cells.entry(coord).or_insert(0.0) += 1.0;
            }
        }
        let total: f64 = cells.values().sum();
        if total <= 0.0 {
            return Err(GenstarError::distribution(
                "seed sample shares no cell with the distribution",
            ));
        }
        for w in cells.values_mut() {
            *w /= total;
        }

        let targets: Vec<Vec<f64>> = (0..dimensions.len()).map(|d| distribution.marginal(d)).collect();
        let mut iterations = 0;
        let mut change = f64::INFINITY;
        while iterations < self.max_iterations && change >= self.delta {
            let previous = cells.clone();
            for (d, target) in targets.iter().enumerate() {
                let mut current = vec![0.0; target.len()];
                for (coord, w) in &cells {
                    current[coord[d]] += w;
                }
                for (coord, w) in cells.iter_mut() {
                    let v = coord[d];
                    *w = if current[v] > 0.0 {
                        *w * target[v] / current[v]
                    } else {
                        0.0
                    };
                }
            }
            change = cells
                .iter()
                .map(|(coord, w)| (w - previous.get(coord).copied().unwrap_or(0.0)).abs())
                .fold(0.0, f64::max);
            iterations += 1;
        }

        debug!(
            event = "ipf_fitted",
            iterations = iterations,
            delta = change,
            seed_cells = cells.len(),
        );
        Distribution::new(dimensions.to_vec(), cells)
    }
}
