//! Target population size resolution.

use tracing::debug;

use crate::algorithm::AlgorithmFamily;

/// Resolved population size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSize {
    /// Draw exactly this many entities; never zero.
    Exact(usize),
    /// Keep the raw sample unchanged, without resampling.
    AsSample,
}

impl TargetSize {
    pub fn exact(&self) -> Option<usize> {
        match self {
            TargetSize::Exact(n) => Some(*n),
            TargetSize::AsSample => None,
        }
    }
}

/// Turns a requested size into a concrete target.
///
/// A positive request is used as is. A non positive request means the size
/// was left unspecified:
/// - synthetic reconstruction draws the minimum total of the contingency
///   tables, or a single entity when there is none
/// - every other family keeps the raw sample unchanged
///
/// # Examples
///
/// ```
/// use genstar_generator::algorithm::AlgorithmFamily;
/// use genstar_generator::size::{resolve_size, TargetSize};
///
/// let sr = AlgorithmFamily::SyntheticReconstruction;
/// assert_eq!(resolve_size(250, sr, &[1000.0]), TargetSize::Exact(250));
/// assert_eq!(resolve_size(-1, sr, &[1000.0, 980.0]), TargetSize::Exact(980));
/// assert_eq!(resolve_size(0, sr, &[]), TargetSize::Exact(1));
/// ```
pub fn resolve_size(
    requested: i64,
    family: AlgorithmFamily,
    contingency_totals: &[f64],
) -> TargetSize {
    let target = if requested > 0 {
        TargetSize::Exact(requested as usize)
    } else {
        match family {
            AlgorithmFamily::SyntheticReconstruction => {
                let min = contingency_totals
                    .iter()
                    .copied()
                    .filter(|t| t.is_finite())
                    .reduce(f64::min)
                    .unwrap_or(1.0);
                TargetSize::Exact((min.round() as usize).max(1))
            }
            _ => TargetSize::AsSample,
        }
    };
    debug!(
        event = "size_resolved",
        requested = requested,
        family = %family,
        target = ?target,
    );
    target
}

#[cfg(test)]
#[path = "size_tests.rs"]
mod tests;
