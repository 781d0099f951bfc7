//! Incremental construction of a generation request.

use std::path::{Path, PathBuf};
use std::time::Duration;

use genstar_config::CoSearchParams;
use genstar_core::{
    Attribute, AttributeDictionary, ConfigurationError, Feature, ValueMapping, ValueType,
};
use indexmap::IndexMap;

use super::GenerationRequest;
use crate::algorithm::{self, AlgorithmId};
use crate::input::{SurveyFile, SurveyType};
use crate::social::{NetworkEngine, NetworkRequest};
use crate::spatial::{
    Bound, DistanceBand, GeoFile, SpatialConstraint, SpatialDistributionKind, SpatialMatch,
    SpatialRequest,
};

type Result<T> = std::result::Result<T, ConfigurationError>;

/// Builder for [`GenerationRequest`].
///
/// Each call records one configuration fact. Calls that can be checked on
/// their own (alias resolution, referents, duplicate names) fail right away.
///
/// Constraints added without a priority get one from a counter owned by the
/// builder, so earlier constraints come first. Explicit priorities are kept
/// as given and move the counter past them; ties keep declaration order.
///
/// # Example
///
/// ```
/// use genstar_core::{Attribute, ValueType};
/// use genstar_generator::request::GenerationRequestBuilder;
///
/// let request = GenerationRequestBuilder::new()
///     .with_algorithm("hierarchical sampling").unwrap()
///     .add_attribute(Attribute::direct("Sex", ValueType::Nominal, ["M", "F"]).unwrap()).unwrap()
///     .add_network("friends", "small_world", Some(0.1), Some(4)).unwrap()
///     .build()
///     .unwrap();
///
/// assert_eq!(request.algorithm_name(), "hierarchical sampling");
/// assert!(request.is_social());
/// ```
#[derive(Debug, Clone, Default)]
pub struct GenerationRequestBuilder {
    algorithm: AlgorithmId,
    seed: Option<u64>,
    ipf: bool,
    base_dir: Option<PathBuf>,
    input_files: Vec<SurveyFile>,
    attributes: AttributeDictionary,
    household_attributes: Option<AttributeDictionary>,
    household_key: Option<String>,
    marginals: Option<Vec<String>>,
    co_search: CoSearchParams,
    spatial: SpatialRequest,
    networks: IndexMap<String, NetworkRequest>,
    priority_counter: u32,
}

impl GenerationRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the algorithm by name or alias.
    pub fn with_algorithm(mut self, name: &str) -> Result<Self> {
        self.algorithm = algorithm::resolve(name)?;
        Ok(self)
    }

    pub fn with_algorithm_id(mut self, algorithm: AlgorithmId) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_ipf(mut self, ipf: bool) -> Self {
        self.ipf = ipf;
        self
    }

    /// Directory relative paths are resolved against when building.
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    pub fn add_input_file(mut self, file: SurveyFile) -> Self {
        self.input_files.push(file);
        self
    }

    /// Adds a survey file with a survey type name or alias.
    pub fn add_input(self, path: impl Into<PathBuf>, survey_type: &str) -> Result<Self> {
        let survey_type = SurveyType::resolve(survey_type)?;
        Ok(self.add_input_file(SurveyFile::new(path, survey_type)))
    }

    pub fn attributes(&self) -> &AttributeDictionary {
        &self.attributes
    }

    pub fn add_attribute(mut self, attribute: Attribute) -> Result<Self> {
        self.attributes.add(attribute)?;
        Ok(self)
    }

    /// Creates a mapped attribute over `referent` without adding it.
    ///
    /// An unnamed mapper is called `<referent>_<n>`, `n` being the
    /// dictionary size plus one.
    pub fn mapper(
        &self,
        name: Option<&str>,
        referent: &str,
        value_type: ValueType,
        mapping: Vec<ValueMapping>,
    ) -> Result<Attribute> {
        mapped_attribute(&self.attributes, name, referent, value_type, mapping)
    }

    pub fn add_mapper(
        self,
        name: Option<&str>,
        referent: &str,
        value_type: ValueType,
        mapping: Vec<ValueMapping>,
    ) -> Result<Self> {
        let attribute = self.mapper(name, referent, value_type, mapping)?;
        self.add_attribute(attribute)
    }

    pub fn add_record(self, name: &str, referent: &str, value_type: ValueType) -> Result<Self> {
        let attribute = record_attribute(&self.attributes, name, referent, value_type)?;
        self.add_attribute(attribute)
    }

    pub fn household_attributes(&self) -> Option<&AttributeDictionary> {
        self.household_attributes.as_ref()
    }

    pub fn add_household_attribute(mut self, attribute: Attribute) -> Result<Self> {
        self.household_attributes
            .get_or_insert_with(AttributeDictionary::new)
            .add(attribute)?;
        Ok(self)
    }

    /// Sample column grouping individuals into households.
    pub fn with_household_key(mut self, key: impl Into<String>) -> Self {
        self.household_key = Some(key.into());
        self
    }

    /// Designates fitting targets. Names must be known attributes of either
    /// dictionary.
    pub fn add_marginals<I, S>(mut self, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            let known = self.attributes.contains(&name)
                || self
                    .household_attributes
                    .as_ref()
                    .is_some_and(|h| h.contains(&name));
            if !known {
                return Err(ConfigurationError::UnknownAttribute(name));
            }
            let marginals = self.marginals.get_or_insert_with(Vec::new);
            if !marginals.contains(&name) {
                marginals.push(name);
            }
        }
        Ok(self)
    }

    pub fn with_co_search(mut self, params: CoSearchParams) -> Self {
        self.co_search = params;
        self
    }

    /// Localizes entities in the nests of a geometry file.
    pub fn localize_on_geometries(mut self, path: impl Into<PathBuf>) -> Self {
        self.spatial.nests = Some(path.into());
        self.spatial.nest_features = None;
        self
    }

    /// Localizes entities in nests held in memory, such as the geometries
    /// of existing agents. Replaces any nest file.
    pub fn localize_on_features(mut self, features: impl IntoIterator<Item = Feature>) -> Self {
        self.spatial.nest_features = Some(GeoFile::new(features.into_iter().collect()));
        self.spatial.nests = None;
        self
    }

    /// Localizes entities in census regions, or matches them to those
    /// regions when nests are also given.
    pub fn localize_on_census(mut self, path: impl Into<PathBuf>) -> Self {
        self.spatial.census = Some(path.into());
        self
    }

    /// Places entities between `min` and `max` away from their nest.
    pub fn localize_around_at(mut self, min: f64, max: f64, overlaps: bool) -> Result<Self> {
        if min < 0.0 || min > max {
            return Err(ConfigurationError::Invalid(format!(
                "invalid localization band [{min}, {max}]"
            )));
        }
        self.spatial.band = Some(DistanceBand { min, max, overlaps });
        Ok(self)
    }

    pub fn with_crs(mut self, crs: impl Into<String>) -> Self {
        self.spatial.crs = Some(crs.into());
        self
    }

    /// Sets the spatial distribution by name or alias.
    pub fn add_distribution(self, kind: &str, feature: Option<&str>) -> Result<Self> {
        let kind = SpatialDistributionKind::resolve(kind)?;
        self.set_distribution(kind, feature)
    }

    pub fn add_area_distribution(self, feature: Option<&str>) -> Result<Self> {
        self.set_distribution(SpatialDistributionKind::Area, feature)
    }

    pub fn add_capacity_distribution(self, feature: &str) -> Result<Self> {
        self.set_distribution(SpatialDistributionKind::Capacity, Some(feature))
    }

    pub fn add_density_distribution(self, feature: &str) -> Result<Self> {
        self.set_distribution(SpatialDistributionKind::Density, Some(feature))
    }

    fn set_distribution(mut self, kind: SpatialDistributionKind, feature: Option<&str>) -> Result<Self> {
        let feature = feature.map(str::trim).filter(|f| !f.is_empty());
        if kind.requires_feature() && feature.is_none() {
            return Err(ConfigurationError::MissingFeatureName(kind.to_string()));
        }
        self.spatial.distribution = kind;
        self.spatial.distribution_feature = feature.map(str::to_string);
        Ok(self)
    }

    fn next_priority(&mut self, explicit: Option<u32>) -> u32 {
        let priority = explicit.unwrap_or(self.priority_counter);
        self.priority_counter = self.priority_counter.max(priority.saturating_add(1));
        priority
    }

    pub fn add_capacity_constraint(
        mut self,
        bound: Bound,
        max: Option<f64>,
        step: Option<f64>,
        priority: Option<u32>,
    ) -> Self {
        let priority = self.next_priority(priority);
        self.spatial
            .constraints
            .push(SpatialConstraint::capacity(bound, max, step, priority));
        self
    }

    pub fn add_density_constraint(
        mut self,
        bound: Bound,
        max: Option<f64>,
        step: Option<f64>,
        priority: Option<u32>,
    ) -> Self {
        let priority = self.next_priority(priority);
        self.spatial
            .constraints
            .push(SpatialConstraint::density(bound, max, step, priority));
        self
    }

    pub fn add_distance_constraint(
        mut self,
        distance: f64,
        max: Option<f64>,
        step: Option<f64>,
        priority: Option<u32>,
    ) -> Self {
        let priority = self.next_priority(priority);
        self.spatial
            .constraints
            .push(SpatialConstraint::distance(distance, max, step, priority));
        self
    }

    /// Matches entities to census regions through `attribute` and the census
    /// field `census_id`, then keeps them in nests within `limit` of their
    /// region, growing the distance by `step` when needed.
    pub fn add_spatial_match(
        mut self,
        attribute: &str,
        census_id: &str,
        limit: f64,
        step: Option<f64>,
        priority: Option<u32>,
    ) -> Result<Self> {
        if self.spatial.census.is_none() {
            return Err(ConfigurationError::MissingCensusGeometry);
        }
        self.spatial.spatial_match = Some(SpatialMatch {
            attribute: attribute.to_string(),
            census_id: census_id.to_string(),
        });
        Ok(self.add_distance_constraint(0.0, Some(limit), step, priority))
    }

    /// Adds a covariate geometry file for regression refinement.
    pub fn add_ancillary_geofile(mut self, path: impl Into<PathBuf>) -> Self {
        self.spatial.ancillary_files.push(path.into());
        self
    }

    pub fn with_regression_time_limit(mut self, limit: Duration) -> Self {
        self.spatial.regression_time_limit = Some(limit);
        self
    }

    /// Declares a network; names are unique.
    pub fn add_network(
        mut self,
        name: &str,
        engine: &str,
        beta: Option<f64>,
        k: Option<usize>,
    ) -> Result<Self> {
        if self.networks.contains_key(name) {
            return Err(ConfigurationError::DuplicateNetwork(name.to_string()));
        }
        let request = NetworkRequest {
            name: name.to_string(),
            engine: NetworkEngine::resolve(engine)?,
            beta,
            k,
        };
        request.validate()?;
        self.networks.insert(name.to_string(), request);
        Ok(self)
    }

    /// Freezes the request.
    ///
    /// Relative paths are resolved against the base directory, marginals
    /// default to every attribute and constraints are ordered by priority.
    pub fn build(self) -> Result<GenerationRequest> {
        let resolve = |path: PathBuf| -> PathBuf {
            match &self.base_dir {
                Some(base) if path.is_relative() => base.join(path),
                _ => path,
            }
        };

        let input_files = self
            .input_files
            .iter()
            .cloned()
            .map(|mut file| {
                file.path = resolve(file.path);
                file
            })
            .collect();

        let mut spatial = self.spatial.clone();
        spatial.nests = spatial.nests.map(&resolve);
        spatial.census = spatial.census.map(&resolve);
        spatial.ancillary_files = spatial.ancillary_files.into_iter().map(&resolve).collect();
        spatial.constraints.sort_by_key(|c| c.priority);
        if !spatial.ancillary_files.is_empty() && spatial.census.is_none() {
            return Err(ConfigurationError::MissingCensusGeometry);
        }
        // a band only offsets points around nests
        if spatial.band.is_some() && !spatial.has_nests() && spatial.census.is_none() {
            return Err(ConfigurationError::MissingGeometry);
        }

        let marginals = match &self.marginals {
            Some(marginals) => marginals.clone(),
            None => self.attributes.names(),
        };

        Ok(GenerationRequest {
            algorithm: self.algorithm,
            seed: self.seed,
            ipf: self.ipf,
            input_files,
            attributes: self.attributes.clone(),
            household_attributes: self.household_attributes.clone(),
            household_key: self.household_key.clone(),
            marginals,
            co_search: self.co_search,
            spatial: spatial.is_active().then_some(spatial),
            networks: self.networks.values().cloned().collect(),
        })
    }
}

/// Mapped attribute over `referent`, named `<referent>_<n>` when unnamed.
pub(crate) fn mapped_attribute(
    dictionary: &AttributeDictionary,
    name: Option<&str>,
    referent: &str,
    value_type: ValueType,
    mapping: Vec<ValueMapping>,
) -> Result<Attribute> {
    let name = match name {
        Some(name) => name.to_string(),
        None => format!("{referent}_{}", dictionary.len() + 1),
    };
    let referent = dictionary
        .get(referent)
        .ok_or_else(|| ConfigurationError::MissingReferent {
            attribute: name.clone(),
            referent: referent.to_string(),
        })?;
    Attribute::mapped(name, value_type, referent, mapping)
}

pub(crate) fn record_attribute(
    dictionary: &AttributeDictionary,
    name: &str,
    referent: &str,
    value_type: ValueType,
) -> Result<Attribute> {
    let referent = dictionary
        .get(referent)
        .ok_or_else(|| ConfigurationError::MissingReferent {
            attribute: name.to_string(),
            referent: referent.to_string(),
        })?;
    Ok(Attribute::record(name, value_type, referent))
}
