//! Error types for Genstar

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Main error type for population generation.
///
/// Every failure of a `generate` call is one of these variants. Entities
/// dropped during localization and interrupted regression refinement are
/// not errors; they are reported on the generation report instead.
#[derive(Debug, Error)]
pub enum GenstarError {
    /// Invalid or incomplete generation configuration
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// A survey or dictionary file could not be read or parsed
    #[error("Input load error in {}: {message}", .path.display())]
    InputLoad { path: PathBuf, message: String },

    /// Survey tables could not be collapsed into one distribution
    #[error("Distribution error: {0}")]
    Distribution(String),

    /// The requested algorithm exists but has not been ported
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// A geometry file could not be read or parsed
    #[error("Geometry error in {}: {message}", .path.display())]
    Geometry { path: PathBuf, message: String },

    /// Regression based refinement failed
    #[error("Regression error: {0}")]
    Regression(String),
}

impl GenstarError {
    pub fn input_load(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        GenstarError::InputLoad {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    pub fn geometry(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        GenstarError::Geometry {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    pub fn distribution(message: impl Into<String>) -> Self {
        GenstarError::Distribution(message.into())
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        GenstarError::NotImplemented(message.into())
    }

    /// Returns true for errors the caller can fix by changing the request.
    pub fn is_configuration(&self) -> bool {
        matches!(self, GenstarError::Configuration(_))
    }
}

/// Configuration problems detected while building or validating a request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("unknown generation algorithm '{0}'")]
    UnknownAlgorithm(String),

    #[error("unknown survey type '{0}'")]
    UnknownSurveyType(String),

    #[error("unknown spatial distribution '{0}'")]
    UnknownSpatialDistribution(String),

    #[error("unknown network engine '{0}'")]
    UnknownNetworkEngine(String),

    #[error("attribute '{0}' is already defined")]
    DuplicateAttribute(String),

    #[error("attribute '{attribute}' refers to '{referent}' which is not defined")]
    MissingReferent { attribute: String, referent: String },

    #[error("attribute '{0}' is not defined")]
    UnknownAttribute(String),

    #[error("spatial feature '{feature}' is missing on geometries {geometries:?}")]
    MissingSpatialFeature {
        feature: String,
        geometries: Vec<String>,
    },

    #[error("spatial distribution '{0}' requires a feature name")]
    MissingFeatureName(String),

    #[error("cannot set a spatial match before the census geometries have been set")]
    MissingCensusGeometry,

    #[error("localization requires nest or census geometries")]
    MissingGeometry,

    #[error("algorithm '{0}' requires at least one sample input file")]
    MissingSample(String),

    #[error("network '{0}' is declared twice")]
    DuplicateNetwork(String),

    #[error("invalid value '{value}' for attribute '{attribute}'")]
    InvalidValue { attribute: String, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type alias for Genstar operations
pub type Result<T> = std::result::Result<T, GenstarError>;
