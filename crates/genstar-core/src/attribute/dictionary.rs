//! Ordered attribute dictionary.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{Attribute, AttributeKind};
use crate::error::ConfigurationError;
use crate::value::Value;

/// A set of uniquely named attributes, in insertion order.
///
/// Record attributes are kept apart from the dimensions of the entity space
/// but share the same name space. Mapped and record attributes can only be
/// added once their referent is present.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AttributeDictionary {
    attributes: IndexMap<String, Attribute>,
    records: IndexMap<String, Attribute>,
}

impl AttributeDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attribute, checking name uniqueness and referent presence.
    pub fn add(&mut self, attribute: Attribute) -> Result<(), ConfigurationError> {
        if self.contains(attribute.name()) {
            return Err(ConfigurationError::DuplicateAttribute(
                attribute.name().to_string(),
            ));
        }
        if let Some(referent) = attribute.referent() {
            if !self.attributes.contains_key(referent) {
                return Err(ConfigurationError::MissingReferent {
                    attribute: attribute.name().to_string(),
                    referent: referent.to_string(),
                });
            }
        }

        let name = attribute.name().to_string();
        if attribute.is_record() {
            self.records.insert(name, attribute);
        } else {
            self.attributes.insert(name, attribute);
        }
        Ok(())
    }

    /// Builder-style [`add`](Self::add).
    pub fn with(mut self, attribute: Attribute) -> Result<Self, ConfigurationError> {
        self.add(attribute)?;
        Ok(self)
    }

    /// Looks up a dimension or record attribute by name.
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name).or_else(|| self.records.get(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name) || self.records.contains_key(name)
    }

    /// Dimensions of the entity space, in insertion order.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }

    pub fn records(&self) -> impl Iterator<Item = &Attribute> {
        self.records.values()
    }

    pub fn names(&self) -> Vec<String> {
        self.attributes.keys().cloned().collect()
    }

    /// Number of dimension attributes (records excluded).
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Resolves a survey column name to the dictionary attribute that owns
    /// it: the attribute itself, or the referent of a mapped attribute.
    pub fn dimension_for(&self, name: &str) -> Option<&Attribute> {
        let attribute = self.attributes.get(name)?;
        match attribute.referent() {
            Some(referent) if attribute.is_mapped() => self.attributes.get(referent),
            _ => Some(attribute),
        }
    }

    /// Fills the mapped attributes missing from `values` from the value of
    /// their referent. The first label of the matching mapping row wins.
    pub fn derive_mapped(&self, values: &mut IndexMap<String, Value>) {
        for attribute in self.attributes.values() {
            if values.contains_key(attribute.name()) {
                continue;
            }
            let AttributeKind::Mapped { referent, mapping } = attribute.kind() else {
                continue;
            };
            let Some(label) = values.get(referent).map(Value::label) else {
                continue;
            };
            let derived = mapping
                .iter()
                .find(|row| row.to.iter().any(|l| l.trim() == label))
                .and_then(|row| row.from.first())
                .and_then(|l| attribute.value_of(l))
                .cloned();
            if let Some(value) = derived {
                values.insert(attribute.name().to_string(), value);
            }
        }
    }
}
