//! Synthesized entities.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::value::Value;

/// Identifier of an entity, unique within its population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One synthesized entity: a value per attribute, an optional location and,
/// for multilevel populations, the member entities it contains.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    id: EntityId,
    values: IndexMap<String, Value>,
    location: Option<Point>,
    nest: Option<String>,
    children: Vec<Entity>,
}

impl Entity {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            values: IndexMap::new(),
            location: None,
            nest: None,
            children: Vec::new(),
        }
    }

    pub fn with_values(id: EntityId, values: IndexMap<String, Value>) -> Self {
        Self {
            values,
            ..Self::new(id)
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn value(&self, attribute: &str) -> Option<&Value> {
        self.values.get(attribute)
    }

    pub fn set_value(&mut self, attribute: impl Into<String>, value: Value) {
        self.values.insert(attribute.into(), value);
    }

    pub fn values(&self) -> &IndexMap<String, Value> {
        &self.values
    }

    /// Returns true if both entities carry the same attribute values,
    /// regardless of identity.
    pub fn same_values(&self, other: &Entity) -> bool {
        self.values == other.values
    }

    pub fn location(&self) -> Option<Point> {
        self.location
    }

    /// Identifier of the nest the entity was localized into.
    pub fn nest(&self) -> Option<&str> {
        self.nest.as_deref()
    }

    pub fn localize(&mut self, location: Point, nest: Option<String>) {
        self.location = Some(location);
        self.nest = nest;
    }

    pub fn children(&self) -> &[Entity] {
        &self.children
    }

    pub fn add_child(&mut self, child: Entity) {
        self.children.push(child);
    }

    /// Number of members of a parent entity, or one for a leaf entity.
    pub fn size(&self) -> usize {
        self.children.len().max(1)
    }
}
