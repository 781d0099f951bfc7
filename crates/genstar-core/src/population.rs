//! Populations of synthesized entities.

use indexmap::IndexMap;

use crate::attribute::AttributeDictionary;
use crate::entity::{Entity, EntityId};
use crate::network::SocialNetwork;
use crate::value::Value;

/// A synthesized population.
///
/// The same type carries the population through every stage: raw after
/// synthesis, spatialized once localized, social once networks are attached.
/// Multilevel populations hold parent entities whose children are described
/// by [`member_attributes`](Self::member_attributes).
#[derive(Debug, Clone, Default)]
pub struct Population {
    attributes: AttributeDictionary,
    member_attributes: Option<AttributeDictionary>,
    entities: Vec<Entity>,
    next_id: u64,
    crs: Option<String>,
    spatialized: bool,
    networks: IndexMap<String, SocialNetwork>,
}

impl Population {
    pub fn new(attributes: AttributeDictionary) -> Self {
        Self {
            attributes,
            ..Self::default()
        }
    }

    /// Creates a two level population: `attributes` describe parents,
    /// `members` describe their children.
    pub fn multilevel(attributes: AttributeDictionary, members: AttributeDictionary) -> Self {
        Self {
            attributes,
            member_attributes: Some(members),
            ..Self::default()
        }
    }

    /// An empty population with the same dictionaries and reference system.
    pub fn empty_like(&self) -> Self {
        Self {
            attributes: self.attributes.clone(),
            member_attributes: self.member_attributes.clone(),
            crs: self.crs.clone(),
            ..Self::default()
        }
    }

    pub fn attributes(&self) -> &AttributeDictionary {
        &self.attributes
    }

    pub fn member_attributes(&self) -> Option<&AttributeDictionary> {
        self.member_attributes.as_ref()
    }

    pub fn attribute_names(&self) -> Vec<String> {
        self.attributes.names()
    }

    /// Allocates a fresh entity identifier.
    pub fn next_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Adds a new entity with the given values.
    pub fn spawn(&mut self, values: IndexMap<String, Value>) -> EntityId {
        let id = self.next_id();
        self.entities.push(Entity::with_values(id, values));
        id
    }

    /// Adds a value copy of `entity` (children included) under fresh identifiers.
    pub fn add_copy(&mut self, entity: &Entity) -> EntityId {
        let copy = self.copy_of(entity);
        let id = copy.id();
        self.entities.push(copy);
        id
    }

    fn copy_of(&mut self, entity: &Entity) -> Entity {
        let mut copy = Entity::with_values(self.next_id(), entity.values().clone());
        for child in entity.children() {
            let child = self.copy_of(child);
            copy.add_child(child);
        }
        copy
    }

    /// Adds an entity built elsewhere, re-identifying it and its children.
    pub fn push(&mut self, entity: Entity) -> EntityId {
        self.add_copy(&entity)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id() == id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Number of leaf entities: members of every parent, or the entities
    /// themselves in a single level population.
    pub fn member_count(&self) -> usize {
        self.entities.iter().map(Entity::size).sum()
    }

    /// Keeps only the entities matching `keep`. Returns the number removed.
    pub fn retain<F>(&mut self, keep: F) -> usize
    where
        F: FnMut(&Entity) -> bool,
    {
        let before = self.entities.len();
        self.entities.retain(keep);
        before - self.entities.len()
    }

    pub fn crs(&self) -> Option<&str> {
        self.crs.as_deref()
    }

    pub fn set_crs(&mut self, crs: impl Into<String>) {
        self.crs = Some(crs.into());
    }

    pub fn is_spatialized(&self) -> bool {
        self.spatialized
    }

    pub fn mark_spatialized(&mut self) {
        self.spatialized = true;
    }

    /// Attaches a network under `name`, returning the one it replaces.
    pub fn add_network(
        &mut self,
        name: impl Into<String>,
        network: SocialNetwork,
    ) -> Option<SocialNetwork> {
        self.networks.insert(name.into(), network)
    }

    pub fn network(&self, name: &str) -> Option<&SocialNetwork> {
        self.networks.get(name)
    }

    pub fn networks(&self) -> impl Iterator<Item = (&str, &SocialNetwork)> {
        self.networks.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_social(&self) -> bool {
        !self.networks.is_empty()
    }
}

#[cfg(test)]
#[path = "population_tests.rs"]
mod tests;
