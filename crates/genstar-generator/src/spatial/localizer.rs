//! Placement of entities into nests.

use std::collections::HashSet;

use genstar_core::{Entity, EntityId, Feature, Geometry, Point, Population, Result};
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution as _;
use rand::{Rng, RngCore};
use tracing::trace;

use super::{DistanceBand, SpatialConstraint, SpatialDistributionKind, SpatialMatch};

/// Attempts made to draw a point inside a distance band.
const BAND_POINT_ATTEMPTS: usize = 1000;

/// Everything a localizer needs, with geometries already loaded.
#[derive(Debug, Clone, Default)]
pub struct SpatialLayout {
    /// Candidate nests.
    pub nests: Vec<Feature>,
    /// Census regions entities are matched to; empty without a matcher.
    pub regions: Vec<Feature>,
    pub spatial_match: Option<SpatialMatch>,
    pub distribution: SpatialDistributionKind,
    pub distribution_feature: Option<String>,
    /// Sorted by priority, ties in declaration order.
    pub constraints: Vec<SpatialConstraint>,
    pub band: Option<DistanceBand>,
    /// Refinement weights, one per nest.
    pub nest_weights: Option<Vec<f64>>,
}

impl SpatialLayout {
    pub fn new(nests: Vec<Feature>) -> Self {
        Self {
            nests,
            ..Self::default()
        }
    }

    /// Census region matched to `entity`, if a matcher is declared.
    pub fn region_of(&self, entity: &Entity) -> Option<&Feature> {
        let matcher = self.spatial_match.as_ref()?;
        let key = entity.value(&matcher.attribute)?.label();
        self.regions.iter().find(|r| {
            r.property(&matcher.census_id)
                .is_some_and(|id| id.as_text() == key)
        })
    }

    fn distribution_weight(&self, nest: &Feature, occupancy: usize) -> f64 {
        let feature = self
            .distribution_feature
            .as_deref()
            .and_then(|f| nest.numeric(f));
        let weight = match self.distribution {
            SpatialDistributionKind::Default => 1.0,
            SpatialDistributionKind::Area => feature.unwrap_or_else(|| nest.geometry.area()),
            SpatialDistributionKind::Capacity => feature.unwrap_or(0.0) - occupancy as f64,
            SpatialDistributionKind::Density => {
                feature.unwrap_or(0.0) * nest.geometry.area() - occupancy as f64
            }
        };
        weight.max(0.0)
    }
}

/// Binds entities to locations.
pub trait SpatialLocalizer {
    /// Localizes every entity of `population` in place and removes those
    /// with no admissible location. Returns the number removed.
    fn localize(
        &self,
        population: &mut Population,
        layout: &SpatialLayout,
        rng: &mut dyn RngCore,
    ) -> Result<usize>;
}

/// Draws a nest per entity, then a point in (or around) that nest.
///
/// Constraints filter the candidate nests in priority order. When no nest
/// passes a constraint at its strictest threshold, the threshold is relaxed
/// step by step; an entity that no relaxation admits is dropped. Every
/// entity starts again from the strictest thresholds.
#[derive(Debug, Clone, Copy, Default)]
pub struct NestLocalizer;

impl NestLocalizer {
    pub fn new() -> Self {
        Self
    }

    fn candidates(&self, layout: &SpatialLayout, occupancy: &[usize], region: Option<&Feature>) -> Vec<usize> {
        let mut candidates: Vec<usize> = (0..layout.nests.len()).collect();
        for constraint in &layout.constraints {
            let mut admitted = Vec::new();
            let relaxed = constraint.relax(|increment| {
                admitted = candidates
                    .iter()
                    .copied()
                    .filter(|&n| constraint.admits(&layout.nests[n], occupancy[n], region, increment))
                    .collect();
                !admitted.is_empty()
            });
            match relaxed {
                Some(increment) => {
                    if increment > 0.0 {
                        trace!(
                            event = "constraint_relaxed",
                            priority = constraint.priority,
                            increment = increment,
                        );
                    }
                    candidates = admitted;
                }
                None => return Vec::new(),
            }
        }
        candidates
    }
}

impl SpatialLocalizer for NestLocalizer {
    fn localize(
        &self,
        population: &mut Population,
        layout: &SpatialLayout,
        rng: &mut dyn RngCore,
    ) -> Result<usize> {
        let mut occupancy = vec![0usize; layout.nests.len()];
        let mut dropped: HashSet<EntityId> = HashSet::new();

        for entity in population.entities_mut() {
            let region = if layout.spatial_match.is_some() {
                match layout.region_of(entity) {
                    Some(region) => Some(region),
                    None => {
                        dropped.insert(entity.id());
                        continue;
                    }
                }
            } else {
                None
            };

            let candidates = self.candidates(layout, &occupancy, region);
            let weights: Vec<f64> = candidates
                .iter()
                .map(|&n| {
                    let refinement = layout
                        .nest_weights
                        .as_ref()
                        .and_then(|w| w.get(n).copied())
                        .unwrap_or(1.0);
                    layout.distribution_weight(&layout.nests[n], occupancy[n]) * refinement
                })
                .collect();
            let Ok(index) = WeightedIndex::new(&weights) else {
                dropped.insert(entity.id());
                continue;
            };
            let n = candidates[index.sample(rng)];
            let nest = &layout.nests[n];

            let point = match &layout.band {
                Some(band) => band.draw_around(&nest.geometry, rng),
                None => nest.geometry.random_point(rng),
            };
            match point {
                Some(point) => {
                    trace!(event = "entity_localized", entity = %entity.id(), nest = %nest.id);
                    entity.localize(point, Some(nest.id.clone()));
                    occupancy[n] += 1;
                }
                None => {
                    dropped.insert(entity.id());
                }
            }
        }

        Ok(population.retain(|e| !dropped.contains(&e.id())))
    }
}

impl DistanceBand {
    /// Draws a point whose distance to `geometry` falls within the band.
    ///
    /// Points inside the geometry are accepted only when overlaps are allowed.
    pub fn draw_around<R: Rng + ?Sized>(&self, geometry: &Geometry, rng: &mut R) -> Option<Point> {
        let bbox = geometry.bounding_box()?;
        let (min_x, max_x) = (bbox.min.x - self.max, bbox.max.x + self.max);
        let (min_y, max_y) = (bbox.min.y - self.max, bbox.max.y + self.max);
        if min_x >= max_x || min_y >= max_y {
            return None;
        }
        (0..BAND_POINT_ATTEMPTS)
            .map(|_| Point::new(rng.random_range(min_x..max_x), rng.random_range(min_y..max_y)))
            .find(|p| {
                if geometry.contains(p) {
                    self.overlaps
                } else {
                    let d = geometry.distance_to(p);
                    d >= self.min && d <= self.max
                }
            })
    }
}
