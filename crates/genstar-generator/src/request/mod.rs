//! Generation requests.
//!
//! A [`GenerationRequestBuilder`] accumulates configuration facts one call
//! at a time and validates each as it arrives; [`build`] freezes them into
//! an immutable [`GenerationRequest`] the pipeline only reads.
//!
//! [`build`]: GenerationRequestBuilder::build

mod assemble;
mod builder;

pub use assemble::RequestAssembler;
pub use builder::GenerationRequestBuilder;

use std::path::Path;

use genstar_config::CoSearchParams;
use genstar_core::AttributeDictionary;

use crate::algorithm::AlgorithmId;
use crate::input::SurveyFile;
use crate::social::NetworkRequest;
use crate::spatial::SpatialRequest;

/// Everything needed to synthesize, localize and socialize a population.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    algorithm: AlgorithmId,
    seed: Option<u64>,
    ipf: bool,
    input_files: Vec<SurveyFile>,
    attributes: AttributeDictionary,
    household_attributes: Option<AttributeDictionary>,
    household_key: Option<String>,
    marginals: Vec<String>,
    co_search: CoSearchParams,
    spatial: Option<SpatialRequest>,
    networks: Vec<NetworkRequest>,
}

impl GenerationRequest {
    pub fn builder() -> GenerationRequestBuilder {
        GenerationRequestBuilder::new()
    }

    pub fn algorithm(&self) -> AlgorithmId {
        self.algorithm
    }

    pub fn algorithm_name(&self) -> &'static str {
        self.algorithm.name()
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn uses_ipf(&self) -> bool {
        self.ipf
    }

    /// Survey files in declaration order, paths resolved.
    pub fn input_files(&self) -> &[SurveyFile] {
        &self.input_files
    }

    pub fn attributes(&self) -> &AttributeDictionary {
        &self.attributes
    }

    pub fn attribute_names(&self) -> Vec<String> {
        self.attributes.names()
    }

    pub fn household_attributes(&self) -> Option<&AttributeDictionary> {
        self.household_attributes.as_ref()
    }

    pub fn household_key(&self) -> Option<&str> {
        self.household_key.as_deref()
    }

    /// Fitting targets; every attribute when none was designated.
    pub fn marginals(&self) -> &[String] {
        &self.marginals
    }

    pub fn co_search(&self) -> CoSearchParams {
        self.co_search
    }

    /// The spatial sub-request, when localization is requested.
    pub fn spatial(&self) -> Option<&SpatialRequest> {
        self.spatial.as_ref().filter(|s| s.is_active())
    }

    /// Networks in declaration order.
    pub fn networks(&self) -> &[NetworkRequest] {
        &self.networks
    }

    /// Census geometry files.
    pub fn census_files(&self) -> Vec<&Path> {
        self.spatial
            .as_ref()
            .and_then(|s| s.census.as_deref())
            .into_iter()
            .collect()
    }

    pub fn is_spatialized(&self) -> bool {
        self.spatial().is_some()
    }

    pub fn is_social(&self) -> bool {
        !self.networks.is_empty()
    }
}
