//! Spatial constraints filtering the nests an entity may be placed in.

use genstar_core::Feature;

/// Slack when comparing relaxed thresholds against their limit.
const RELAXATION_EPSILON: f64 = 1e-9;

/// Threshold of a capacity or density constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    /// Same threshold for every nest.
    Constant(f64),
    /// Threshold read from a numeric nest feature.
    Feature(String),
}

impl Bound {
    fn base(&self, nest: &Feature) -> Option<f64> {
        match self {
            Bound::Constant(v) => Some(*v),
            Bound::Feature(name) => nest.numeric(name),
        }
    }
}

/// What a constraint measures.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintKind {
    /// Entities placed in the nest stay below the threshold.
    Capacity(Bound),
    /// Entities per unit of nest area stay within the threshold.
    Density(Bound),
    /// The nest lies within the threshold distance of the entity's census
    /// region. Entities without a region are not restricted.
    Distance(f64),
}

/// A constraint and its relaxation policy.
///
/// The threshold starts at its base value and may be raised by `step` until
/// it has grown by `max_increase`. For constant bounds `max_increase` is the
/// distance between the initial value and the declared maximum; for feature
/// bounds the declared maximum is the increase itself.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialConstraint {
    pub kind: ConstraintKind,
    pub step: f64,
    pub max_increase: f64,
    /// Lower values are applied first.
    pub priority: u32,
}

impl SpatialConstraint {
    pub fn capacity(bound: Bound, max: Option<f64>, step: Option<f64>, priority: u32) -> Self {
        Self::relaxable(ConstraintKind::Capacity(bound), max, step, priority)
    }

    pub fn density(bound: Bound, max: Option<f64>, step: Option<f64>, priority: u32) -> Self {
        Self::relaxable(ConstraintKind::Density(bound), max, step, priority)
    }

    pub fn distance(distance: f64, max: Option<f64>, step: Option<f64>, priority: u32) -> Self {
        Self::relaxable(ConstraintKind::Distance(distance), max, step, priority)
    }

    fn relaxable(kind: ConstraintKind, max: Option<f64>, step: Option<f64>, priority: u32) -> Self {
        let initial = match &kind {
            ConstraintKind::Capacity(Bound::Constant(v))
            | ConstraintKind::Density(Bound::Constant(v))
            | ConstraintKind::Distance(v) => Some(*v),
            _ => None,
        };
        let max_increase = match (initial, max) {
            (Some(initial), Some(max)) => (max - initial).max(0.0),
            (None, Some(max)) => max.max(0.0),
            (_, None) => 0.0,
        };
        Self {
            kind,
            step: step.unwrap_or(0.0).max(0.0),
            max_increase,
            priority,
        }
    }

    /// Nest feature the constraint reads, if any.
    pub fn feature(&self) -> Option<&str> {
        match &self.kind {
            ConstraintKind::Capacity(Bound::Feature(f)) | ConstraintKind::Density(Bound::Feature(f)) => {
                Some(f)
            }
            _ => None,
        }
    }

    /// Threshold increments, strictest first: `0, step, 2 * step, ...` up to
    /// `max_increase`.
    pub fn increments(&self) -> Vec<f64> {
        let mut increments = vec![0.0];
        if self.step <= 0.0 {
            return increments;
        }
        let mut k = 1.0;
        while k * self.step <= self.max_increase + RELAXATION_EPSILON {
            increments.push(k * self.step);
            k += 1.0;
        }
        increments
    }

    /// Threshold applied to `nest` at the given increment.
    pub fn threshold(&self, nest: &Feature, increment: f64) -> Option<f64> {
        let base = match &self.kind {
            ConstraintKind::Capacity(bound) | ConstraintKind::Density(bound) => bound.base(nest)?,
            ConstraintKind::Distance(d) => *d,
        };
        Some(base + increment)
    }

    /// Whether `nest`, already holding `occupancy` entities, admits one more
    /// at the given increment.
    pub fn admits(
        &self,
        nest: &Feature,
        occupancy: usize,
        region: Option<&Feature>,
        increment: f64,
    ) -> bool {
        let Some(threshold) = self.threshold(nest, increment) else {
            return false;
        };
        match &self.kind {
            ConstraintKind::Capacity(_) => (occupancy as f64) < threshold,
            ConstraintKind::Density(_) => {
                let area = nest.geometry.area();
                area > 0.0 && (occupancy as f64 + 1.0) / area <= threshold + RELAXATION_EPSILON
            }
            ConstraintKind::Distance(_) => match region {
                None => true,
                Some(region) => nest
                    .geometry
                    .centroid()
                    .is_some_and(|c| region.geometry.distance_to(&c) <= threshold + RELAXATION_EPSILON),
            },
        }
    }

    /// Tries increments in order and returns the first one `admits` accepts.
    ///
    /// Stops at the first admitting increment; later ones are never tried.
    pub fn relax<F>(&self, mut admits: F) -> Option<f64>
    where
        F: FnMut(f64) -> bool,
    {
        self.increments().into_iter().find(|&increment| admits(increment))
    }
}
