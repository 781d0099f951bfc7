//! Genstar - Synthetic population generation in Rust
//!
//! Describe the generation in a TOML or YAML file and call
//! [`generate_from_file`], or build a [`GenerationRequest`] in code and hand
//! it to a [`PopulationGenerator`].
//!
//! # Example
//!
//! ```rust
//! use genstar::prelude::*;
//!
//! let request = GenerationRequest::builder()
//!     .with_algorithm("hs")
//!     .unwrap()
//!     .build()
//!     .unwrap();
//! assert_eq!(request.algorithm_name(), "hierarchical sampling");
//! ```

// Domain model
pub use genstar_core::{
    Attribute, AttributeDictionary, ConfigurationError, Entity, EntityId, GenstarError, Point,
    Population, SocialNetwork, Value, ValueType,
};

// File based configuration
pub use genstar_config::{ConfigError, GenerationConfig};

// Pipeline
pub use genstar_generator::{
    EntityMaterializer, EntityRecord, EntityShape, GenerationOutcome, GenerationReport,
    GenerationRequest, GenerationRequestBuilder, PopulationGenerator, RequestAssembler,
};

#[cfg(feature = "console")]
pub mod console;

mod generate;
pub use generate::{generate_from_config, generate_from_file, Error};

pub mod prelude {
    pub use super::{
        generate_from_config, generate_from_file, Attribute, GenerationConfig, GenerationOutcome,
        GenerationRequest, PopulationGenerator, Value, ValueType,
    };
}
