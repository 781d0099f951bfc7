//! Projection of a generated population into externally consumable shapes.

use genstar_core::{EntityId, Point, Population, Value};
use indexmap::IndexMap;
use rand::seq::SliceRandom;
use rand::RngCore;
use serde::Serialize;
use tracing::debug;

/// Key under which a record carries the entity location.
pub const LOCATION_KEY: &str = "location";

/// A value of a map-bearing record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RecordValue {
    Value(Value),
    Location(Point),
}

/// One entity as a key/value record, attributes in dictionary order.
pub type EntityRecord = IndexMap<String, RecordValue>;

/// One localized entity as a geometry-bearing shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityShape {
    pub id: EntityId,
    pub location: Point,
    pub crs: Option<String>,
    pub attributes: IndexMap<String, Value>,
}

/// Projects a population into records or shapes.
///
/// A positive `count` smaller than the number of candidates shuffles them
/// and keeps the first `count`; any other count returns every candidate in
/// population order.
#[derive(Debug, Clone)]
pub struct EntityMaterializer<'a> {
    population: &'a Population,
    crs: Option<String>,
}

impl<'a> EntityMaterializer<'a> {
    pub fn new(population: &'a Population) -> Self {
        Self {
            population,
            crs: None,
        }
    }

    /// Overrides the reference system carried by shapes.
    pub fn with_crs(mut self, crs: impl Into<String>) -> Self {
        self.crs = Some(crs.into());
        self
    }

    /// One record per entity, with a `location` entry once spatialized.
    pub fn as_records(&self, count: i64, rng: &mut dyn RngCore) -> Vec<EntityRecord> {
        let names = self.population.attribute_names();
        let spatialized = self.population.is_spatialized();
        let candidates: Vec<usize> = (0..self.population.len()).collect();
        let records: Vec<EntityRecord> = select(candidates, count, rng)
            .into_iter()
            .map(|i| {
                let entity = &self.population.entities()[i];
                let mut record: EntityRecord = names
                    .iter()
                    .map(|name| {
                        let value = entity.value(name).cloned().unwrap_or(Value::Empty);
                        (name.clone(), RecordValue::Value(value))
                    })
                    .collect();
                if let Some(location) = entity.location().filter(|_| spatialized) {
                    record.insert(LOCATION_KEY.to_string(), RecordValue::Location(location));
                }
                record
            })
            .collect();
        debug!(event = "materialized", shape = "records", count = records.len());
        records
    }

    /// One shape per localized entity; entities without a location are
    /// skipped.
    pub fn as_shapes(&self, count: i64, rng: &mut dyn RngCore) -> Vec<EntityShape> {
        let crs = self
            .crs
            .clone()
            .or_else(|| self.population.crs().map(str::to_string));
        let entities = self.population.entities();
        let candidates: Vec<usize> = entities
            .iter()
            .enumerate()
            .filter(|(_, e)| e.location().is_some())
            .map(|(i, _)| i)
            .collect();
        let skipped = entities.len() - candidates.len();

        let shapes: Vec<EntityShape> = select(candidates, count, rng)
            .into_iter()
            .filter_map(|i| {
                let entity = &entities[i];
                Some(EntityShape {
                    id: entity.id(),
                    location: entity.location()?,
                    crs: crs.clone(),
                    attributes: entity.values().clone(),
                })
            })
            .collect();
        debug!(
            event = "materialized",
            shape = "shapes",
            count = shapes.len(),
            skipped = skipped,
        );
        shapes
    }
}

fn select(mut candidates: Vec<usize>, count: i64, rng: &mut dyn RngCore) -> Vec<usize> {
    match usize::try_from(count) {
        Ok(count) if count > 0 && count < candidates.len() => {
            candidates.shuffle(rng);
            candidates.truncate(count);
            candidates
        }
        _ => candidates,
    }
}

#[cfg(test)]
#[path = "materialize_tests.rs"]
mod tests;
