//! Samplers drawing entities from a distribution or a sample.
//!
//! - [`DirectSampler`]: weighted draw over the cells of a joint distribution
//! - [`HierarchicalSampler`]: draws one dimension at a time from conditionals
//! - [`IpfFitter`]: fits a seed sample onto a distribution's marginals
//! - [`MicroDataSampler`]: uniform draw with replacement from a sample
//! - [`MultilevelSampler`], [`MultilevelSearchSampler`]: household draws

mod direct;
mod hierarchical;
mod ipf;
mod micro;
mod multilevel;

pub use direct::DirectSampler;
pub use hierarchical::HierarchicalSampler;
pub use ipf::{IpfFitter, IPF_DELTA, IPF_MAX_ITERATIONS};
pub use micro::MicroDataSampler;
pub use multilevel::{
    HillClimbingAcceptor, MultilevelSampler, MultilevelSearchSampler, Objective, ObjectiveLevel,
};

use genstar_core::{Population, Result};
use rand::RngCore;

/// A component producing entities on demand.
///
/// Every draw is taken sequentially from the given generator, so a seeded
/// generator reproduces the same population.
pub trait Sampler {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Draws `count` entities.
    ///
    /// For multilevel samplers `count` is the number of members to reach.
    fn draw(&self, count: usize, rng: &mut dyn RngCore) -> Result<Population>;
}
