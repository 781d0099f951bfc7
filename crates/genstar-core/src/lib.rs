//! Genstar Core - Core types for population synthesis
//!
//! This crate provides the fundamental abstractions for Genstar:
//! - Typed values and the attributes describing the entity space
//! - Entities and populations, single or multilevel
//! - Planar geometry used by spatial localization
//! - Social networks attached to populations
//! - The error taxonomy shared by every stage

pub mod attribute;
pub mod entity;
pub mod error;
pub mod geometry;
pub mod network;
pub mod population;
pub mod value;

pub use attribute::{Attribute, AttributeDictionary, AttributeKind, ValueMapping};
pub use entity::{Entity, EntityId};
pub use error::{ConfigurationError, GenstarError, Result};
pub use geometry::{BoundingBox, Feature, Geometry, Point, Polygon, PropertyValue};
pub use network::SocialNetwork;
pub use population::Population;
pub use value::{RangeValue, Value, ValueType};
