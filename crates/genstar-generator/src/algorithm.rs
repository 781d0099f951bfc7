//! Algorithm identifiers and alias resolution.
//!
//! Every algorithm belongs to a family. Names given by the caller are
//! resolved case-insensitively against a fixed alias table; there is no
//! fuzzy matching.

use std::fmt;

use genstar_core::ConfigurationError;

use self::Algorithm as A;
use self::AlgorithmFamily as F;

/// Family of generation algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgorithmFamily {
    /// Sampling from a joint distribution fitted on aggregate tables.
    SyntheticReconstruction,
    /// Resampling or search over a micro-data sample.
    CombinatorialOptimization,
    Mixture,
    /// Households and their members generated together.
    Multilevel,
}

impl fmt::Display for AlgorithmFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlgorithmFamily::SyntheticReconstruction => "synthetic reconstruction",
            AlgorithmFamily::CombinatorialOptimization => "combinatorial optimization",
            AlgorithmFamily::Mixture => "mixture",
            AlgorithmFamily::Multilevel => "multilevel",
        };
        f.write_str(name)
    }
}

/// Algorithm within a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    DirectSampling,
    HierarchicalSampling,
    UniformSampling,
    RandomSearch,
    TabuSearch,
    SimulatedAnnealing,
    Mixture,
}

/// A fully resolved algorithm: family and algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlgorithmId {
    pub family: AlgorithmFamily,
    pub algorithm: Algorithm,
}

impl AlgorithmId {
    pub const fn new(family: AlgorithmFamily, algorithm: Algorithm) -> Self {
        Self { family, algorithm }
    }

    /// Canonical name: the first alias of its table entry.
    pub fn name(&self) -> &'static str {
        ALGORITHMS
            .iter()
            .find(|(id, _)| id == self)
            .and_then(|(_, aliases)| aliases.first().copied())
            .unwrap_or("unknown")
    }
}

impl Default for AlgorithmId {
    fn default() -> Self {
        DIRECT_SAMPLING
    }
}

impl fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.family)
    }
}

pub const DIRECT_SAMPLING: AlgorithmId =
    AlgorithmId::new(F::SyntheticReconstruction, A::DirectSampling);

/// Algorithm table: each identifier with its aliases, canonical name first.
pub const ALGORITHMS: &[(AlgorithmId, &[&str])] = &[
    (DIRECT_SAMPLING, &["direct sampling", "ds", "is"]),
    (
        AlgorithmId::new(F::SyntheticReconstruction, A::HierarchicalSampling),
        &["hierarchical sampling", "hs"],
    ),
    (
        AlgorithmId::new(F::CombinatorialOptimization, A::UniformSampling),
        &["uniform sampling", "us", "simple_draw"],
    ),
    (
        AlgorithmId::new(F::CombinatorialOptimization, A::RandomSearch),
        &["random search", "rs"],
    ),
    (
        AlgorithmId::new(F::CombinatorialOptimization, A::TabuSearch),
        &["tabu search", "tabu", "ts"],
    ),
    (
        AlgorithmId::new(F::CombinatorialOptimization, A::SimulatedAnnealing),
        &["simulated annealing", "sa"],
    ),
    (AlgorithmId::new(F::Mixture, A::Mixture), &["mixture", "mix"]),
    (
        AlgorithmId::new(F::Multilevel, A::UniformSampling),
        &["multilevel sampling", "multilevel", "ml"],
    ),
    (
        AlgorithmId::new(F::Multilevel, A::RandomSearch),
        &["multilevel random search", "mlrs"],
    ),
    (
        AlgorithmId::new(F::Multilevel, A::TabuSearch),
        &["multilevel tabu search", "mlts"],
    ),
    (
        AlgorithmId::new(F::Multilevel, A::SimulatedAnnealing),
        &["multilevel simulated annealing", "mlsa"],
    ),
];

/// Resolves an algorithm name or alias, ignoring ASCII case.
///
/// # Examples
///
/// ```
/// use genstar_generator::algorithm::{resolve, Algorithm, AlgorithmFamily};
///
/// let id = resolve("Hierarchical Sampling").unwrap();
/// assert_eq!(id.family, AlgorithmFamily::SyntheticReconstruction);
/// assert_eq!(id.algorithm, Algorithm::HierarchicalSampling);
/// assert!(resolve("gibbs").is_err());
/// ```
pub fn resolve(name: &str) -> Result<AlgorithmId, ConfigurationError> {
    ALGORITHMS
        .iter()
        .find(|(_, aliases)| aliases.iter().any(|a| a.eq_ignore_ascii_case(name)))
        .map(|(id, _)| *id)
        .ok_or_else(|| ConfigurationError::UnknownAlgorithm(name.to_string()))
}

#[cfg(test)]
#[path = "algorithm_tests.rs"]
mod tests;
