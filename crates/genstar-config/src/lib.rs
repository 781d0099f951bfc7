//! Configuration system for Genstar.
//!
//! Describe a whole generation (inputs, attributes, algorithm, spatial
//! localization and networks) in a TOML or YAML file instead of code.
//!
//! # Examples
//!
//! Load configuration from TOML string:
//!
//! ```
//! use genstar_config::GenerationConfig;
//!
//! let config = GenerationConfig::from_toml_str(r#"
//!     algorithm = "Direct Sampling"
//!     seed = 42
//!
//!     [[input_files]]
//!     path = "census.csv"
//!     survey_type = "ContingencyTable"
//!
//!     [[attributes]]
//!     kind = "direct"
//!     name = "Sex"
//!     values = ["M", "F"]
//!
//!     [[networks]]
//!     name = "friends"
//!     engine = "small_world"
//!     k = 4
//!     beta = 0.1
//! "#).unwrap();
//!
//! assert_eq!(config.seed, Some(42));
//! assert_eq!(config.input_files.len(), 1);
//! assert_eq!(config.networks[0].k, Some(4));
//! ```
//!
//! Use default config when file is missing:
//!
//! ```
//! use genstar_config::GenerationConfig;
//!
//! let config = GenerationConfig::load("generation.toml").unwrap_or_default();
//! // Proceeds with defaults if file doesn't exist
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use genstar_core::{ValueMapping, ValueType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main generation configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct GenerationConfig {
    /// Algorithm name or alias; direct sampling when absent.
    #[serde(default)]
    pub algorithm: Option<String>,

    /// Random seed for reproducible results.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Refine direct sampling with iterative proportional fitting.
    #[serde(default)]
    pub ipf: bool,

    /// Directory relative input paths are resolved against.
    #[serde(default)]
    pub base_dir: Option<PathBuf>,

    /// Survey files, in the order they are declared.
    #[serde(default)]
    pub input_files: Vec<InputFileConfig>,

    /// Attribute dictionary of the generated entities.
    #[serde(default)]
    pub attributes: Vec<AttributeConfig>,

    /// Attribute dictionary of the parent level of multilevel sources.
    #[serde(default)]
    pub household_attributes: Vec<AttributeConfig>,

    /// Sample column grouping individuals into households.
    #[serde(default)]
    pub household_key: Option<String>,

    /// Attributes used as fitting targets; all attributes when empty.
    #[serde(default)]
    pub marginals: Vec<String>,

    /// Combinatorial search parameters.
    #[serde(default)]
    pub co_search: CoSearchParams,

    /// Spatial localization.
    #[serde(default)]
    pub spatial: Option<SpatialConfig>,

    /// Networks attached to the generated population.
    #[serde(default)]
    pub networks: Vec<NetworkConfig>,
}

impl GenerationConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML or YAML file, by extension.
    ///
    /// # Errors
    ///
    /// Returns error if file doesn't exist or cannot be parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_file(path),
            _ => Self::from_toml_file(path),
        }
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.co_search.fitness_threshold) {
            return Err(ConfigError::Invalid(format!(
                "fitness_threshold must be within [0, 1], got {}",
                self.co_search.fitness_threshold
            )));
        }
        if let Some(spatial) = &self.spatial {
            if let (Some(min), Some(max)) = (spatial.min_distance, spatial.max_distance) {
                if min > max {
                    return Err(ConfigError::Invalid(format!(
                        "min_distance {min} exceeds max_distance {max}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Sets the algorithm name or alias.
    pub fn with_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = Some(algorithm.into());
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Adds a survey file.
    pub fn with_input_file(mut self, file: InputFileConfig) -> Self {
        self.input_files.push(file);
        self
    }

    /// Adds an attribute.
    pub fn with_attribute(mut self, attribute: AttributeConfig) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Adds a network declaration.
    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.networks.push(network);
        self
    }
}

/// A survey file declaration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct InputFileConfig {
    pub path: PathBuf,

    /// Survey type name or alias (contingency, global/local frequency, sample).
    pub survey_type: String,

    #[serde(default = "default_separator")]
    pub separator: char,

    /// Number of header rows.
    #[serde(default = "default_first_row_index")]
    pub first_row_index: usize,

    /// Number of leading columns skipped on every row.
    #[serde(default)]
    pub first_column_index: usize,
}

impl InputFileConfig {
    pub fn new(path: impl Into<PathBuf>, survey_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            survey_type: survey_type.into(),
            separator: default_separator(),
            first_row_index: default_first_row_index(),
            first_column_index: 0,
        }
    }
}

fn default_separator() -> char {
    ','
}

fn default_first_row_index() -> usize {
    1
}

/// An attribute declaration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttributeConfig {
    /// Attribute with an explicit value list.
    Direct {
        name: String,
        #[serde(default)]
        value_type: ValueType,
        values: Vec<String>,
        #[serde(default)]
        linked_to: Option<String>,
    },

    /// Numeric buckets.
    Range {
        name: String,
        values: Vec<String>,
        #[serde(default)]
        linked_to: Option<String>,
    },

    /// Attribute derived from a referent; named `<referent>_<n>` when unnamed.
    Mapped {
        #[serde(default)]
        name: Option<String>,
        referent: String,
        #[serde(default)]
        value_type: ValueType,
        mapping: Vec<ValueMapping>,
        #[serde(default)]
        linked_to: Option<String>,
    },

    /// Count keyed by a referent.
    Record {
        name: String,
        referent: String,
        #[serde(default = "default_record_type")]
        value_type: ValueType,
    },
}

fn default_record_type() -> ValueType {
    ValueType::Integer
}

/// Neighbour search parameters for multilevel combinatorial optimization.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CoSearchParams {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Households swapped per neighbour move.
    #[serde(default = "default_neighborhood_extent")]
    pub neighborhood_extent: usize,

    /// Accepted error as a share of the target size.
    #[serde(default = "default_fitness_threshold")]
    pub fitness_threshold: f64,
}

impl Default for CoSearchParams {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            neighborhood_extent: default_neighborhood_extent(),
            fitness_threshold: default_fitness_threshold(),
        }
    }
}

fn default_max_iterations() -> usize {
    1000
}

fn default_neighborhood_extent() -> usize {
    5
}

fn default_fitness_threshold() -> f64 {
    0.05
}

/// Spatial localization configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SpatialConfig {
    /// Geometry file of the candidate nests.
    pub nests: Option<PathBuf>,

    /// Geometry file of the census regions.
    pub census: Option<PathBuf>,

    /// Coordinate reference system of the output; inherited from nests when absent.
    pub crs: Option<String>,

    pub min_distance: Option<f64>,

    pub max_distance: Option<f64>,

    /// Whether a located entity may fall inside its nest geometry.
    #[serde(default)]
    pub overlaps: bool,

    pub distribution: Option<DistributionConfig>,

    #[serde(default)]
    pub constraints: Vec<ConstraintConfig>,

    pub spatial_match: Option<SpatialMatchConfig>,

    /// Covariate geometry files for regression refinement.
    #[serde(default)]
    pub ancillary_files: Vec<PathBuf>,

    /// Maximum seconds spent fitting the regression.
    pub regression_seconds_limit: Option<u64>,
}

impl SpatialConfig {
    /// Returns the regression time limit as a Duration, if any.
    pub fn regression_time_limit(&self) -> Option<Duration> {
        self.regression_seconds_limit.map(Duration::from_secs)
    }
}

/// Spatial distribution kind (name or alias) and its feature.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DistributionConfig {
    pub kind: String,

    #[serde(default)]
    pub feature: Option<String>,
}

/// Spatial constraint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConstraintConfig {
    /// Maximum number of entities per nest.
    Capacity(BoundConfig),

    /// Maximum number of entities per unit of nest area.
    Density(BoundConfig),

    /// Maximum distance between a nest and the entity's census region.
    Distance(DistanceConfig),
}

/// Capacity or density bound, constant or read from a nest feature.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BoundConfig {
    /// Constant bound; ignored when `feature` is set.
    pub value: Option<f64>,

    /// Nest feature holding the bound.
    pub feature: Option<String>,

    /// Hard upper limit of the relaxed bound.
    pub max: Option<f64>,

    /// Relaxation step.
    pub step: Option<f64>,

    pub priority: Option<u32>,
}

/// Distance constraint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DistanceConfig {
    pub distance: f64,

    pub max: Option<f64>,

    pub step: Option<f64>,

    pub priority: Option<u32>,
}

/// Join between a population attribute and a census identifier field.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SpatialMatchConfig {
    /// Population attribute holding the census identifier.
    pub attribute: String,

    /// Census feature holding the identifier.
    pub census_id: String,

    /// Largest distance between a nest and its census region.
    #[serde(default)]
    pub limit: f64,

    pub step: Option<f64>,

    pub priority: Option<u32>,
}

/// A network declaration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct NetworkConfig {
    pub name: String,

    /// Engine name or alias.
    pub engine: String,

    pub beta: Option<f64>,

    pub k: Option<usize>,
}
