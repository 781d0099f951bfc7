//! Genstar Generator - the population generation pipeline
//!
//! This crate turns a [`GenerationRequest`] into a population:
//! - Algorithm and population size resolution
//! - Survey loading, distribution collapsing and sampling
//! - Synthesis orchestration per algorithm family
//! - Spatial localization with relaxable constraints
//! - Social network attachment
//! - Materialization into records and shapes
//!
//! # Example
//!
//! ```
//! use genstar_generator::{GenerationRequest, PopulationGenerator};
//!
//! let request = GenerationRequest::builder()
//!     .with_algorithm("hierarchical sampling")
//!     .unwrap()
//!     .add_network("friends", "small_world", Some(0.1), Some(4))
//!     .unwrap()
//!     .build()
//!     .unwrap();
//! assert!(request.is_social());
//! assert!(!request.is_spatialized());
//!
//! let generator = PopulationGenerator::new();
//! assert!(generator.generate(None, 10).unwrap().is_none());
//! ```

pub mod algorithm;
pub mod distribution;
pub mod input;
pub mod materialize;
pub mod pipeline;
pub mod request;
pub mod sampler;
pub mod size;
pub mod social;
pub mod spatial;
pub mod synthesis;

pub use algorithm::{resolve, Algorithm, AlgorithmFamily, AlgorithmId};
pub use distribution::{Distribution, DistributionCollapser, TableCollapser};
pub use input::{CsvSurveyLoader, DataTable, SurveyFile, SurveyLoader, SurveyType};
pub use materialize::{EntityMaterializer, EntityRecord, EntityShape, RecordValue, LOCATION_KEY};
pub use pipeline::{GenerationOutcome, GenerationReport, GenerationRng, PopulationGenerator};
pub use request::{GenerationRequest, GenerationRequestBuilder, RequestAssembler};
pub use sampler::Sampler;
pub use size::{resolve_size, TargetSize};
pub use social::{GraphGenerator, NetworkEngine, NetworkGenerator, NetworkRequest, SocializationStage};
pub use spatial::{
    Bound, CancellationToken, RefinementOutcome, SpatialConstraint, SpatialDistributionKind,
    SpatializationStage,
};
pub use synthesis::{SynthesisOrchestrator, SynthesisState};
