//! Typed attribute values.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Data type of an attribute's values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Boolean,
    Integer,
    Continuous,
    Range,
    #[default]
    Nominal,
    Ordinal,
}

impl ValueType {
    /// Parses a label into a value of this type.
    ///
    /// `rank` is only used for ordinal values and gives the position of the
    /// label in its value space.
    pub fn parse(&self, attribute: &str, label: &str, rank: usize) -> Result<Value, ConfigurationError> {
        let trimmed = label.trim();
        let invalid = || ConfigurationError::InvalidValue {
            attribute: attribute.to_string(),
            value: label.to_string(),
        };
        match self {
            ValueType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(Value::Boolean(true)),
                "false" | "no" | "0" => Ok(Value::Boolean(false)),
                _ => Err(invalid()),
            },
            ValueType::Integer => trimmed.parse::<i64>().map(Value::Integer).map_err(|_| invalid()),
            ValueType::Continuous => trimmed
                .parse::<f64>()
                .map(Value::Continuous)
                .map_err(|_| invalid()),
            ValueType::Range => RangeValue::parse(trimmed).map(Value::Range).ok_or_else(invalid),
            ValueType::Nominal => Ok(Value::Nominal(trimmed.to_string())),
            ValueType::Ordinal => Ok(Value::Ordinal {
                label: trimmed.to_string(),
                rank,
            }),
        }
    }
}

/// A numeric bucket such as `0-18`, `19 to 64` or `65+`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RangeValue {
    pub label: String,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl RangeValue {
    /// Parses a range label.
    ///
    /// Accepted forms: `a-b`, `a to b`, `a+`, `>a`, `<b`, `a`.
    ///
    /// ```
    /// use genstar_core::value::RangeValue;
    ///
    /// let r = RangeValue::parse("65+").unwrap();
    /// assert_eq!(r.lower, Some(65.0));
    /// assert_eq!(r.upper, None);
    /// ```
    pub fn parse(label: &str) -> Option<Self> {
        let text = label.trim();
        if text.is_empty() {
            return None;
        }
        let number = |s: &str| s.trim().parse::<f64>().ok();

        let (lower, upper) = if let Some(rest) = text.strip_suffix('+') {
            (Some(number(rest)?), None)
        } else if let Some(rest) = text.strip_prefix('>') {
            (Some(number(rest.trim_start_matches('='))?), None)
        } else if let Some(rest) = text.strip_prefix('<') {
            (None, Some(number(rest.trim_start_matches('='))?))
        } else if let Some((a, b)) = text.split_once(" to ") {
            (Some(number(a)?), Some(number(b)?))
        } else if let Some((a, b)) = split_dash(text) {
            (Some(number(a)?), Some(number(b)?))
        } else {
            let n = number(text)?;
            (Some(n), Some(n))
        };

        Some(RangeValue {
            label: text.to_string(),
            lower,
            upper,
        })
    }

    /// Returns true if `x` falls in this bucket (bounds inclusive).
    pub fn contains(&self, x: f64) -> bool {
        self.lower.map_or(true, |l| x >= l) && self.upper.map_or(true, |u| x <= u)
    }
}

// Splits on the first dash that is not a leading minus sign.
fn split_dash(text: &str) -> Option<(&str, &str)> {
    let start = usize::from(text.starts_with('-'));
    let idx = text[start..].find('-')? + start;
    Some((&text[..idx], &text[idx + 1..]))
}

/// A value of an entity for one attribute.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Continuous(f64),
    Range(RangeValue),
    Nominal(String),
    Ordinal { label: String, rank: usize },
    Empty,
}

impl Value {
    /// Returns the label this value was parsed from.
    pub fn label(&self) -> String {
        match self {
            Value::Boolean(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Continuous(c) => c.to_string(),
            Value::Range(r) => r.label.clone(),
            Value::Nominal(s) => s.clone(),
            Value::Ordinal { label, .. } => label.clone(),
            Value::Empty => String::new(),
        }
    }

    /// Returns true if `label` designates this value.
    pub fn matches_label(&self, label: &str) -> bool {
        let label = label.trim();
        match self {
            Value::Boolean(b) => match label.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => *b,
                "false" | "no" | "0" => !*b,
                _ => false,
            },
            Value::Integer(i) => label.parse::<i64>().map_or(false, |x| x == *i),
            Value::Continuous(c) => label.parse::<f64>().map_or(false, |x| x == *c),
            Value::Range(r) => r.label == label,
            Value::Nominal(s) => s == label,
            Value::Ordinal { label: l, .. } => l == label,
            Value::Empty => label.is_empty(),
        }
    }

    /// Numeric view of the value, if any. Ranges use their midpoint,
    /// or their only bound when open.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Continuous(c) => Some(*c),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Range(r) => match (r.lower, r.upper) {
                (Some(l), Some(u)) => Some((l + u) / 2.0),
                (Some(l), None) => Some(l),
                (None, Some(u)) => Some(u),
                (None, None) => None,
            },
            Value::Ordinal { rank, .. } => Some(*rank as f64),
            Value::Nominal(_) | Value::Empty => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
#[path = "value_tests.rs"]
mod tests;
