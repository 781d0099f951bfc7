//! Spatial localization of a synthesized population.
//!
//! The stage loads nest and census geometries, checks the spatial features
//! the distribution and constraints rely on, optionally refines nest weights
//! by regression on ancillary covariates, then hands the population to a
//! [`SpatialLocalizer`].

mod constraint;
mod geofile;
mod localizer;
mod regression;

pub use constraint::{Bound, ConstraintKind, SpatialConstraint};
pub use geofile::{GeoFile, GeoJsonReader, GeometryReader};
pub use localizer::{NestLocalizer, SpatialLayout, SpatialLocalizer};
pub use regression::{
    predict, CancellationToken, Interrupt, OlsRegression, RefinementOutcome, RegressionMapper,
};

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use genstar_core::{ConfigurationError, Feature, Population, Result};
use rand::RngCore;
use tracing::{debug, info, warn};

/// How nests are weighted when drawing one for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpatialDistributionKind {
    /// Every admissible nest is equally likely.
    #[default]
    Default,
    /// Proportional to the nest area, or to the distribution feature if set.
    Area,
    /// Proportional to the capacity left in the nest feature.
    Capacity,
    /// Proportional to the room left by the nest's density feature.
    Density,
}

const DISTRIBUTION_ALIASES: &[(SpatialDistributionKind, &[&str])] = &[
    (SpatialDistributionKind::Default, &["default", "uniform"]),
    (SpatialDistributionKind::Area, &["area", "areal"]),
    (SpatialDistributionKind::Capacity, &["capacity"]),
    (SpatialDistributionKind::Density, &["density"]),
];

impl SpatialDistributionKind {
    /// Resolves a distribution name, ignoring case.
    pub fn resolve(name: &str) -> std::result::Result<Self, ConfigurationError> {
        let name = name.trim();
        DISTRIBUTION_ALIASES
            .iter()
            .find(|(_, aliases)| aliases.iter().any(|a| a.eq_ignore_ascii_case(name)))
            .map(|(kind, _)| *kind)
            .ok_or_else(|| ConfigurationError::UnknownSpatialDistribution(name.to_string()))
    }

    /// Whether the distribution cannot work without a feature name.
    pub fn requires_feature(&self) -> bool {
        matches!(
            self,
            SpatialDistributionKind::Capacity | SpatialDistributionKind::Density
        )
    }
}

impl fmt::Display for SpatialDistributionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = DISTRIBUTION_ALIASES
            .iter()
            .find(|(kind, _)| kind == self)
            .and_then(|(_, aliases)| aliases.first())
            .copied()
            .unwrap_or("default");
        f.write_str(name)
    }
}

/// Distance band entities are placed in, around their nest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceBand {
    pub min: f64,
    pub max: f64,
    /// Whether an entity may be placed inside its nest geometry.
    pub overlaps: bool,
}

/// Join between a population attribute and a census identifier field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpatialMatch {
    pub attribute: String,
    pub census_id: String,
}

/// The spatial part of a generation request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpatialRequest {
    pub nests: Option<PathBuf>,
    /// Nests supplied in memory; used instead of the nest file when set.
    pub nest_features: Option<GeoFile>,
    pub census: Option<PathBuf>,
    /// Output reference system; inherited from the geometries when absent.
    pub crs: Option<String>,
    pub band: Option<DistanceBand>,
    pub distribution: SpatialDistributionKind,
    pub distribution_feature: Option<String>,
    /// Sorted by priority, ties in declaration order.
    pub constraints: Vec<SpatialConstraint>,
    pub spatial_match: Option<SpatialMatch>,
    pub ancillary_files: Vec<PathBuf>,
    pub regression_time_limit: Option<Duration>,
}

impl SpatialRequest {
    /// Whether localization runs: nests, a census file, or a distance band.
    pub fn is_active(&self) -> bool {
        self.has_nests() || self.census.is_some() || self.band.is_some()
    }

    /// Whether nests come from a file or from memory.
    pub fn has_nests(&self) -> bool {
        self.nests.is_some() || self.nest_features.is_some()
    }
}

/// What the spatialization stage reports besides the population itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpatialReport {
    /// Entities removed because no nest admitted them.
    pub dropped: usize,
    pub refinement: RefinementOutcome,
}

/// Runs localization with swappable geometry reader, localizer and
/// regression mapper.
pub struct SpatializationStage {
    reader: Box<dyn GeometryReader>,
    localizer: Box<dyn SpatialLocalizer>,
    mapper: Box<dyn RegressionMapper>,
}

impl Default for SpatializationStage {
    fn default() -> Self {
        Self {
            reader: Box::new(GeoJsonReader::new()),
            localizer: Box::new(NestLocalizer::new()),
            mapper: Box::new(OlsRegression::new()),
        }
    }
}

impl fmt::Debug for SpatializationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpatializationStage").finish_non_exhaustive()
    }
}

impl SpatializationStage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reader(mut self, reader: impl GeometryReader + 'static) -> Self {
        self.reader = Box::new(reader);
        self
    }

    pub fn with_localizer(mut self, localizer: impl SpatialLocalizer + 'static) -> Self {
        self.localizer = Box::new(localizer);
        self
    }

    pub fn with_mapper(mut self, mapper: impl RegressionMapper + 'static) -> Self {
        self.mapper = Box::new(mapper);
        self
    }

    /// Localizes `population` in place.
    ///
    /// Geometry and covariate read failures abort the stage. Dropped
    /// entities and an interrupted refinement are reported, not raised.
    pub fn run(
        &self,
        population: &mut Population,
        request: &SpatialRequest,
        interrupt: &Interrupt,
        rng: &mut dyn RngCore,
    ) -> Result<SpatialReport> {
        let nests = match (&request.nest_features, &request.nests) {
            (Some(features), _) => Some(features.clone()),
            (None, Some(path)) => Some(self.reader.read(path)?),
            (None, None) => None,
        };
        let census = request.census.as_deref().map(|p| self.reader.read(p)).transpose()?;

        let crs = request.crs.clone().or_else(|| {
            nests
                .as_ref()
                .and_then(|n| n.crs.clone())
                .or_else(|| census.as_ref().and_then(|c| c.crs.clone()))
        });
        if let Some(crs) = crs {
            population.set_crs(crs);
        }

        let (nest_path, nest_features): (&Path, Vec<Feature>) = match (&nests, &census) {
            (Some(n), _) => (request.nests.as_deref().unwrap_or(Path::new("memory")), n.features.clone()),
            (None, Some(c)) => (request.census.as_deref().unwrap_or(Path::new("")), c.features.clone()),
            (None, None) => return Err(ConfigurationError::MissingGeometry.into()),
        };

        if request.distribution.requires_feature() && request.distribution_feature.is_none() {
            return Err(ConfigurationError::MissingFeatureName(request.distribution.to_string()).into());
        }
        let required = request
            .constraints
            .iter()
            .filter_map(SpatialConstraint::feature)
            .chain(request.distribution_feature.as_deref());
        for feature in required {
            check_feature(&nest_features, feature)?;
        }

        let mut layout = SpatialLayout {
            nests: nest_features,
            regions: Vec::new(),
            spatial_match: request.spatial_match.clone(),
            distribution: request.distribution,
            distribution_feature: request.distribution_feature.clone(),
            constraints: request.constraints.clone(),
            band: request.band,
            nest_weights: None,
        };
        if layout.distribution == SpatialDistributionKind::Area
            && layout.distribution_feature.is_none()
            && layout.nests.iter().all(|n| n.geometry.area() <= 0.0)
        {
            debug!(
                event = "distribution_fallback",
                from = %SpatialDistributionKind::Area,
                to = %SpatialDistributionKind::Default,
                reason = "nests have no area",
            );
            layout.distribution = SpatialDistributionKind::Default;
        }
        if let Some(matcher) = &request.spatial_match {
            let census = census.as_ref().ok_or(ConfigurationError::MissingCensusGeometry)?;
            check_feature(&census.features, &matcher.census_id)?;
            layout.regions = census.features.clone();
        }
        debug!(
            event = "spatial_layout",
            nests = layout.nests.len(),
            nest_file = %nest_path.display(),
            regions = layout.regions.len(),
            distribution = %layout.distribution,
            constraints = layout.constraints.len(),
        );

        let refinement = if request.ancillary_files.is_empty() {
            RefinementOutcome::NotRequested
        } else {
            let census = census.as_ref().ok_or(ConfigurationError::MissingCensusGeometry)?;
            let interrupt = match request.regression_time_limit {
                Some(limit) => interrupt.clone().with_time_limit(limit),
                None => interrupt.clone(),
            };
            self.refine(population, request, &census.features, &mut layout, &interrupt)?
        };

        let dropped = self.localizer.localize(population, &layout, rng)?;
        population.mark_spatialized();
        if dropped > 0 {
            warn!(
                event = "placement_loss",
                dropped = dropped,
                remaining = population.len(),
            );
        }
        info!(
            event = "spatialization_end",
            located = population.len(),
            dropped = dropped,
            crs = population.crs().unwrap_or("none"),
        );
        Ok(SpatialReport { dropped, refinement })
    }

    /// Regresses per region entity counts on ancillary covariates, then
    /// weights nests by their normalized prediction.
    fn refine(
        &self,
        population: &Population,
        request: &SpatialRequest,
        regions: &[Feature],
        layout: &mut SpatialLayout,
        interrupt: &Interrupt,
    ) -> Result<RefinementOutcome> {
        let ancillary = request
            .ancillary_files
            .iter()
            .map(|p| self.reader.read(p))
            .collect::<Result<Vec<_>>>()?;
        let names = covariate_names(&ancillary);

        let covariates: Vec<Vec<f64>> = regions
            .iter()
            .map(|r| covariates_at(&ancillary, &names, r))
            .collect();
        let targets = region_targets(population, regions, layout);

        let outcome = self.mapper.fit(&covariates, &targets, interrupt)?;
        match &outcome {
            RefinementOutcome::Fitted { coefficients } => {
                let predictions: Vec<f64> = layout
                    .nests
                    .iter()
                    .map(|n| predict(coefficients, &covariates_at(&ancillary, &names, n)).max(0.0))
                    .collect();
                let total: f64 = predictions.iter().sum();
                if total > 0.0 {
                    layout.nest_weights = Some(predictions.iter().map(|p| p / total).collect());
                }
                debug!(
                    event = "refinement_fitted",
                    covariates = names.len(),
                    observations = regions.len(),
                );
            }
            RefinementOutcome::Interrupted => {
                warn!(event = "refinement_skipped", reason = "interrupted");
            }
            RefinementOutcome::NotRequested => {}
        }
        Ok(outcome)
    }
}

fn check_feature(features: &[Feature], name: &str) -> Result<()> {
    let missing: Vec<String> = features
        .iter()
        .filter(|f| f.property(name).is_none())
        .map(|f| f.id.clone())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ConfigurationError::MissingSpatialFeature {
            feature: name.to_string(),
            geometries: missing,
        }
        .into())
    }
}

// Numeric property names across all covariate files, first seen first.
fn covariate_names(files: &[GeoFile]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for feature in files.iter().flat_map(|f| &f.features) {
        for (name, value) in &feature.properties {
            if value.as_f64().is_some() && !names.contains(name) {
                names.push(name.clone());
            }
        }
    }
    names
}

// Covariate values at the centroid of `feature`; zero where no covariate
// geometry covers it.
fn covariates_at(files: &[GeoFile], names: &[String], feature: &Feature) -> Vec<f64> {
    let centroid = feature.geometry.centroid();
    names
        .iter()
        .map(|name| {
            centroid
                .and_then(|c| {
                    files
                        .iter()
                        .flat_map(|f| &f.features)
                        .filter(|f| f.geometry.contains(&c))
                        .find_map(|f| f.numeric(name))
                })
                .unwrap_or(0.0)
        })
        .collect()
}

// Entities matched to each region, or the population spread by area.
fn region_targets(population: &Population, regions: &[Feature], layout: &SpatialLayout) -> Vec<f64> {
    if layout.spatial_match.is_some() {
        let matching = SpatialLayout {
            regions: regions.to_vec(),
            spatial_match: layout.spatial_match.clone(),
            ..SpatialLayout::default()
        };
        let mut counts = vec![0.0; regions.len()];
        for entity in population.entities() {
            if let Some(region) = matching.region_of(entity) {
                if let Some(i) = regions.iter().position(|r| r.id == region.id) {
                    counts[i] += 1.0;
                }
            }
        }
        counts
    } else {
        let total_area: f64 = regions.iter().map(|r| r.geometry.area()).sum();
        regions
            .iter()
            .map(|r| {
                if total_area > 0.0 {
                    population.len() as f64 * r.geometry.area() / total_area
                } else {
                    0.0
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests;
