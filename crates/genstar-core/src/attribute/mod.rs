//! Attributes describe the dimensions of the entity space.
//!
//! - [`Attribute`]: a named, typed dimension with its value space
//! - [`AttributeKind`]: direct, range, mapped or record attribute
//! - [`AttributeDictionary`]: an ordered set of uniquely named attributes

mod dictionary;

pub use dictionary::AttributeDictionary;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::value::{Value, ValueType};

/// How an attribute relates to other attributes of its dictionary.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttributeKind {
    /// Explicit list of values.
    Direct,

    /// Numeric buckets.
    Range,

    /// Derived from a referent through an explicit value-set table.
    Mapped {
        referent: String,
        mapping: Vec<ValueMapping>,
    },

    /// Count or aggregate keyed by a referent.
    Record { referent: String },
}

/// One row of a mapped attribute's table: a set of this attribute's labels
/// corresponds to a set of the referent's labels.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ValueMapping {
    pub from: Vec<String>,
    pub to: Vec<String>,
}

impl ValueMapping {
    pub fn new<A, B>(from: A, to: B) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        B: IntoIterator,
        B::Item: Into<String>,
    {
        Self {
            from: from.into_iter().map(Into::into).collect(),
            to: to.into_iter().map(Into::into).collect(),
        }
    }
}

/// A named, typed dimension of the entity space.
///
/// # Examples
///
/// ```
/// use genstar_core::attribute::Attribute;
/// use genstar_core::value::ValueType;
///
/// let sex = Attribute::direct("Sex", ValueType::Nominal, ["M", "F"]).unwrap();
/// assert_eq!(sex.name(), "Sex");
/// assert_eq!(sex.values().len(), 2);
/// assert!(sex.index_of("F").is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Attribute {
    name: String,
    value_type: ValueType,
    values: Vec<Value>,
    kind: AttributeKind,
    #[serde(default)]
    linked_to: Option<String>,
}

impl Attribute {
    /// Creates an attribute with an explicit value space.
    ///
    /// Attributes of [`ValueType::Range`] get the [`AttributeKind::Range`] kind.
    pub fn direct<I>(
        name: impl Into<String>,
        value_type: ValueType,
        labels: I,
    ) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let name = name.into();
        let values = parse_value_space(&name, value_type, labels)?;
        let kind = if value_type == ValueType::Range {
            AttributeKind::Range
        } else {
            AttributeKind::Direct
        };
        Ok(Self {
            name,
            value_type,
            values,
            kind,
            linked_to: None,
        })
    }

    /// Creates an attribute derived from `referent` through `mapping`.
    ///
    /// The value space is the ordered union of the mapping's `from` labels.
    /// Every `to` label must belong to the referent's value space.
    pub fn mapped(
        name: impl Into<String>,
        value_type: ValueType,
        referent: &Attribute,
        mapping: Vec<ValueMapping>,
    ) -> Result<Self, ConfigurationError> {
        let name = name.into();
        for row in &mapping {
            for label in &row.to {
                if referent.index_of(label).is_none() {
                    return Err(ConfigurationError::InvalidValue {
                        attribute: referent.name.clone(),
                        value: label.clone(),
                    });
                }
            }
        }

        let mut labels: Vec<&str> = Vec::new();
        for label in mapping.iter().flat_map(|row| row.from.iter()) {
            if !labels.contains(&label.as_str()) {
                labels.push(label);
            }
        }
        let values = parse_value_space(&name, value_type, labels)?;

        Ok(Self {
            name,
            value_type,
            values,
            kind: AttributeKind::Mapped {
                referent: referent.name.clone(),
                mapping,
            },
            linked_to: None,
        })
    }

    /// Creates a record attribute: a count keyed by `referent`.
    pub fn record(name: impl Into<String>, value_type: ValueType, referent: &Attribute) -> Self {
        Self {
            name: name.into(),
            value_type,
            values: Vec::new(),
            kind: AttributeKind::Record {
                referent: referent.name.clone(),
            },
            linked_to: None,
        }
    }

    /// Declares this attribute equivalent to `other` for marginal selection.
    pub fn with_link(mut self, other: impl Into<String>) -> Self {
        self.linked_to = Some(other.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn kind(&self) -> &AttributeKind {
        &self.kind
    }

    pub fn linked_to(&self) -> Option<&str> {
        self.linked_to.as_deref()
    }

    /// Name of the referent attribute for mapped and record attributes.
    pub fn referent(&self) -> Option<&str> {
        match &self.kind {
            AttributeKind::Mapped { referent, .. } | AttributeKind::Record { referent } => {
                Some(referent)
            }
            AttributeKind::Direct | AttributeKind::Range => None,
        }
    }

    pub fn is_record(&self) -> bool {
        matches!(self.kind, AttributeKind::Record { .. })
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self.kind, AttributeKind::Mapped { .. })
    }

    /// Returns true if either attribute declares a link to the other.
    pub fn is_linked(&self, other: &Attribute) -> bool {
        self.linked_to.as_deref() == Some(other.name.as_str())
            || other.linked_to.as_deref() == Some(self.name.as_str())
    }

    /// Position of the value designated by `label`.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.values.iter().position(|v| v.matches_label(label))
    }

    /// Value designated by `label`.
    pub fn value_of(&self, label: &str) -> Option<&Value> {
        self.index_of(label).map(|i| &self.values[i])
    }

    /// Translates one of this attribute's labels into the referent labels it
    /// maps to. Returns `None` for non mapped attributes or unknown labels.
    pub fn referent_labels(&self, label: &str) -> Option<&[String]> {
        match &self.kind {
            AttributeKind::Mapped { mapping, .. } => mapping
                .iter()
                .find(|row| row.from.iter().any(|l| l.trim() == label.trim()))
                .map(|row| row.to.as_slice()),
            _ => None,
        }
    }
}

fn parse_value_space<I>(
    name: &str,
    value_type: ValueType,
    labels: I,
) -> Result<Vec<Value>, ConfigurationError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    labels
        .into_iter()
        .enumerate()
        .map(|(rank, label)| value_type.parse(name, label.as_ref(), rank))
        .collect()
}

#[cfg(test)]
mod tests;
