//! Joint distributions and table collapsing.

use std::collections::BTreeMap;

use genstar_core::{Attribute, AttributeDictionary, GenstarError, Result, Value};
use indexmap::IndexMap;
use tracing::debug;

use crate::input::{DataTable, SurveyType};

/// Relative tolerance between the totals of contingency tables sharing a
/// dimension.
pub const CONTROL_TOTAL_TOLERANCE: f64 = 0.01;

/// A joint probability distribution over a set of dimensions.
///
/// Cells are keyed by value indices, one per dimension. Probabilities are
/// normalized to sum to one.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    dimensions: Vec<Attribute>,
    cells: BTreeMap<Vec<usize>, f64>,
}

impl Distribution {
    /// Creates a distribution from non negative weights.
    pub fn new(dimensions: Vec<Attribute>, weights: BTreeMap<Vec<usize>, f64>) -> Result<Self> {
        if weights.values().any(|w| *w < 0.0 || !w.is_finite()) {
            return Err(GenstarError::distribution("negative or non finite cell"));
        }
        let total: f64 = weights.values().sum();
        if total <= 0.0 {
            return Err(GenstarError::distribution("distribution has a zero total"));
        }
        let cells = weights
            .into_iter()
            .filter(|(_, w)| *w > 0.0)
            .map(|(coord, w)| (coord, w / total))
            .collect();
        Ok(Self { dimensions, cells })
    }

    pub fn dimensions(&self) -> &[Attribute] {
        &self.dimensions
    }

    pub fn cells(&self) -> &BTreeMap<Vec<usize>, f64> {
        &self.cells
    }

    pub fn probability(&self, coord: &[usize]) -> f64 {
        self.cells.get(coord).copied().unwrap_or(0.0)
    }

    /// Marginal probabilities of one dimension, indexed by value.
    pub fn marginal(&self, dimension: usize) -> Vec<f64> {
        let size = self.dimensions[dimension].values().len();
        let mut marginal = vec![0.0; size];
        for (coord, p) in &self.cells {
            marginal[coord[dimension]] += p;
        }
        marginal
    }

    /// Attribute values designated by a cell.
    pub fn values_of(&self, coord: &[usize]) -> IndexMap<String, Value> {
        self.dimensions
            .iter()
            .zip(coord)
            .map(|(attribute, &i)| {
                let value = attribute.values().get(i).cloned().unwrap_or(Value::Empty);
                (attribute.name().to_string(), value)
            })
            .collect()
    }

    pub fn position(&self, dimension: &str) -> Option<usize> {
        self.dimensions.iter().position(|d| d.name() == dimension)
    }
}

/// Collapses loaded tables into a single joint distribution.
pub trait DistributionCollapser {
    fn collapse(&self, tables: &[DataTable], attributes: &AttributeDictionary) -> Result<Distribution>;
}

/// Builds the joint distribution by chaining conditional probabilities.
///
/// Contingency and global frequency tables come first, in declaration
/// order, then local frequency tables. Each table contributes the
/// distribution of its new dimensions conditional on the dimensions already
/// collected; a local frequency table conditions on its first dimension,
/// which an earlier table must define.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableCollapser;

impl TableCollapser {
    pub fn new() -> Self {
        Self
    }
}

impl DistributionCollapser for TableCollapser {
    fn collapse(&self, tables: &[DataTable], attributes: &AttributeDictionary) -> Result<Distribution> {
        if tables.is_empty() {
            return Err(GenstarError::distribution("no table to collapse"));
        }
        for table in tables {
            check_table(table)?;
        }
        check_control_totals(tables)?;

        let mut ordered: Vec<&DataTable> = tables
            .iter()
            .filter(|t| t.survey_type != SurveyType::LocalFrequencyTable)
            .collect();
        ordered.extend(
            tables
                .iter()
                .filter(|t| t.survey_type == SurveyType::LocalFrequencyTable),
        );

        let mut dimensions: Vec<String> = Vec::new();
        let mut joint: BTreeMap<Vec<usize>, f64> = BTreeMap::from([(Vec::new(), 1.0)]);
        for table in ordered {
            let conditioning: Vec<usize> = if table.survey_type == SurveyType::LocalFrequencyTable {
                let first = &table.dimensions[0];
                if !dimensions.contains(first) {
                    return Err(GenstarError::distribution(format!(
                        "local table {} conditions on '{first}' which no earlier table defines",
                        table.source.display()
                    )));
                }
                vec![0]
            } else {
                (0..table.dimensions.len())
                    .filter(|&i| dimensions.contains(&table.dimensions[i]))
                    .collect()
            };
            let added: Vec<usize> = (0..table.dimensions.len())
                .filter(|&i| !dimensions.contains(&table.dimensions[i]))
                .collect();
            if added.is_empty() {
                debug!(
                    event = "table_skipped",
                    source = %table.source.display(),
                    reason = "no new dimension",
                );
                continue;
            }

            let conditional = conditional_of(table, &conditioning, &added);
            let joint_positions: Vec<usize> = conditioning
                .iter()
                .map(|&i| {
                    dimensions
                        .iter()
                        .position(|d| *d == table.dimensions[i])
                        .unwrap_or_default()
                })
                .collect();

            let mut extended = BTreeMap::new();
            for (coord, p) in &joint {
                let key: Vec<usize> = joint_positions.iter().map(|&j| coord[j]).collect();
                let Some(rows) = conditional.get(&key) else {
                    continue;
                };
                for (tail, q) in rows {
                    let mut cell = coord.clone();
                    cell.extend_from_slice(tail);
                    extended.insert(cell, p * q);
                }
            }
            if extended.values().sum::<f64>() <= 0.0 {
                return Err(GenstarError::distribution(format!(
                    "table {} shares no cell with the previous tables",
                    table.source.display()
                )));
            }
            joint = extended;
            dimensions.extend(added.iter().map(|&i| table.dimensions[i].clone()));
        }

        let attributes: Vec<Attribute> = dimensions
            .iter()
            .map(|name| {
                attributes.get(name).cloned().ok_or_else(|| {
                    GenstarError::distribution(format!("dimension '{name}' is not an attribute"))
                })
            })
            .collect::<Result<_>>()?;
        let distribution = Distribution::new(attributes, joint)?;
        debug!(
            event = "distribution_collapsed",
            tables = tables.len(),
            dimensions = ?dimensions,
            cells = distribution.cells().len(),
        );
        Ok(distribution)
    }
}

fn check_table(table: &DataTable) -> Result<()> {
    let source = table.source.display();
    if table.dimensions.is_empty() || table.cells.is_empty() {
        return Err(GenstarError::distribution(format!("table {source} is empty")));
    }
    if table.cells.values().any(|v| *v < 0.0 || !v.is_finite()) {
        return Err(GenstarError::distribution(format!(
            "table {source} has a negative cell"
        )));
    }
    if table.total() <= 0.0 {
        return Err(GenstarError::distribution(format!(
            "table {source} has a zero total"
        )));
    }
    Ok(())
}

fn check_control_totals(tables: &[DataTable]) -> Result<()> {
    let contingency: Vec<&DataTable> = tables
        .iter()
        .filter(|t| t.survey_type == SurveyType::ContingencyTable)
        .collect();
    for (i, a) in contingency.iter().enumerate() {
        for b in &contingency[i + 1..] {
            if !a.dimensions.iter().any(|d| b.dimensions.contains(d)) {
                continue;
            }
            let (ta, tb) = (a.total(), b.total());
            if (ta - tb).abs() > CONTROL_TOTAL_TOLERANCE * ta.max(tb) {
                return Err(GenstarError::distribution(format!(
                    "inconsistent control totals: {} sums to {ta}, {} sums to {tb}",
                    a.source.display(),
                    b.source.display()
                )));
            }
        }
    }
    Ok(())
}

// Probability of the `added` coordinates given the `conditioning` ones.
fn conditional_of(
    table: &DataTable,
    conditioning: &[usize],
    added: &[usize],
) -> BTreeMap<Vec<usize>, Vec<(Vec<usize>, f64)>> {
    let mut keep: Vec<usize> = conditioning.to_vec();
    keep.extend_from_slice(added);
    let projected = table.project(&keep);

    let mut totals: BTreeMap<Vec<usize>, f64> = BTreeMap::new();
    for (coord, v) in &projected {
        *totals.entry(coord[..conditioning.len()].to_vec()).or_insert(0.0) += v;
    }

    let mut conditional: BTreeMap<Vec<usize>, Vec<(Vec<usize>, f64)>> = BTreeMap::new();
    for (coord, v) in projected {
        let (key, tail) = coord.split_at(conditioning.len());
        let total = totals.get(key).copied().unwrap_or(0.0);
        if total > 0.0 && v > 0.0 {
            conditional
                .entry(key.to_vec())
                .or_default()
                .push((tail.to_vec(), v / total));
        }
    }
    conditional
}

#[cfg(test)]
#[path = "distribution_tests.rs"]
mod tests;
