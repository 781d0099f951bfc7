//! CSV survey loader.

use std::collections::BTreeMap;

use ::csv::{ReaderBuilder, StringRecord, Trim};
use genstar_core::{
    Attribute, AttributeDictionary, Entity, EntityId, GenstarError, Population, Result, Value,
};
use indexmap::IndexMap;
use tracing::debug;

use super::{DataTable, SurveyFile, SurveyLoader, SurveyType};

/// Loads survey files written as delimited text.
///
/// Tables use a long layout: one column per dimension followed by one value
/// column. Samples hold one row per entity and one column per attribute;
/// columns that name no attribute are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvSurveyLoader;

impl CsvSurveyLoader {
    pub fn new() -> Self {
        Self
    }

    /// Loads one aggregate table.
    pub fn load_table(&self, file: &SurveyFile, attributes: &AttributeDictionary) -> Result<DataTable> {
        let sheet = Sheet::read(file)?;
        if sheet.header.len() < 2 {
            return Err(GenstarError::input_load(
                &file.path,
                "a table needs at least one dimension column and a value column",
            ));
        }
        let (dimension_columns, _value_column) = sheet.header.split_at(sheet.header.len() - 1);

        let mut columns: Vec<&Attribute> = Vec::with_capacity(dimension_columns.len());
        let mut dimensions: Vec<String> = Vec::with_capacity(dimension_columns.len());
        for name in dimension_columns {
            let attribute = attributes
                .get(name)
                .filter(|a| !a.is_record())
                .ok_or_else(|| {
                    GenstarError::input_load(&file.path, format!("unknown attribute column '{name}'"))
                })?;
            let dimension = attributes.dimension_for(name).unwrap_or(attribute);
            if dimensions.iter().any(|d| d == dimension.name()) {
                return Err(GenstarError::input_load(
                    &file.path,
                    format!("dimension '{}' appears twice", dimension.name()),
                ));
            }
            dimensions.push(dimension.name().to_string());
            columns.push(attribute);
        }

        let mut cells: BTreeMap<Vec<usize>, f64> = BTreeMap::new();
        for (line, row) in sheet.rows.iter().enumerate() {
            let value_label = row.get(dimension_columns.len()).ok_or_else(|| {
                GenstarError::input_load(
                    &file.path,
                    format!("row {} has {} columns, expected {}", line + 1, row.len(), sheet.header.len()),
                )
            })?;
            let value: f64 = value_label.parse().map_err(|_| {
                GenstarError::input_load(
                    &file.path,
                    format!("row {}: '{value_label}' is not a number", line + 1),
                )
            })?;

            let mut expansions: Vec<Vec<usize>> = Vec::with_capacity(columns.len());
            for (attribute, label) in columns.iter().zip(row.iter()) {
                expansions.push(dimension_indices(attribute, label, attributes, file)?);
            }
            let share = value / expansions.iter().map(|e| e.len() as f64).product::<f64>();
            for coord in cartesian(&expansions) {
                *cells.entry(coord).or_insert(0.0) += share;
            }
        }

        debug!(
            event = "table_loaded",
            path = %file.path.display(),
            survey_type = %file.survey_type,
            dimensions = ?dimensions,
            cells = cells.len(),
        );
        Ok(DataTable {
            source: file.path.clone(),
            survey_type: file.survey_type,
            dimensions,
            cells,
        })
    }

    /// Loads one sample file into a single level population.
    pub fn load_sample(&self, file: &SurveyFile, attributes: &AttributeDictionary) -> Result<Population> {
        let sheet = Sheet::read(file)?;
        let columns = sheet.columns_of(attributes);

        let mut population = Population::new(attributes.clone());
        for row in &sheet.rows {
            let values = parse_values(row, &columns, file)?;
            population.spawn(values);
        }
        debug!(
            event = "sample_loaded",
            path = %file.path.display(),
            entities = population.len(),
        );
        Ok(population)
    }

    /// Loads one sample file into a two level population.
    pub fn load_multilayer_sample(
        &self,
        file: &SurveyFile,
        households: &AttributeDictionary,
        individuals: &AttributeDictionary,
        household_key: &str,
    ) -> Result<Population> {
        let sheet = Sheet::read(file)?;
        let key_column = sheet
            .header
            .iter()
            .position(|h| h == household_key)
            .ok_or_else(|| {
                GenstarError::input_load(
                    &file.path,
                    format!("missing household key column '{household_key}'"),
                )
            })?;
        let household_columns = sheet.columns_of(households);
        let individual_columns = sheet.columns_of(individuals);

        let mut groups: IndexMap<String, Entity> = IndexMap::new();
        for row in &sheet.rows {
            let key = row.get(key_column).cloned().unwrap_or_default();
            if !groups.contains_key(&key) {
                let values = parse_values(row, &household_columns, file)?;
                groups.insert(key.clone(), Entity::with_values(EntityId(0), values));
            }
            let member = Entity::with_values(EntityId(0), parse_values(row, &individual_columns, file)?);
            if let Some(household) = groups.get_mut(&key) {
                household.add_child(member);
            }
        }

        let mut population = Population::multilevel(households.clone(), individuals.clone());
        for (_, household) in groups {
            population.push(household);
        }
        debug!(
            event = "sample_loaded",
            path = %file.path.display(),
            households = population.len(),
            members = population.member_count(),
        );
        Ok(population)
    }
}

impl SurveyLoader for CsvSurveyLoader {
    fn load_tables(
        &self,
        files: &[SurveyFile],
        attributes: &AttributeDictionary,
    ) -> Result<Vec<DataTable>> {
        files
            .iter()
            .filter(|f| f.survey_type.is_table())
            .map(|f| self.load_table(f, attributes))
            .collect()
    }

    fn load_samples(
        &self,
        files: &[SurveyFile],
        attributes: &AttributeDictionary,
    ) -> Result<Vec<Population>> {
        files
            .iter()
            .filter(|f| f.survey_type == SurveyType::Sample)
            .map(|f| self.load_sample(f, attributes))
            .collect()
    }

    fn load_multilayer_samples(
        &self,
        files: &[SurveyFile],
        households: &AttributeDictionary,
        individuals: &AttributeDictionary,
        household_key: &str,
    ) -> Result<Vec<Population>> {
        files
            .iter()
            .filter(|f| f.survey_type == SurveyType::Sample)
            .map(|f| self.load_multilayer_sample(f, households, individuals, household_key))
            .collect()
    }
}

/// Header and data rows of a delimited file, leading columns removed.
struct Sheet {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Sheet {
    fn read(file: &SurveyFile) -> Result<Self> {
        if !file.separator.is_ascii() {
            return Err(GenstarError::input_load(
                &file.path,
                format!("separator '{}' is not an ASCII character", file.separator),
            ));
        }
        if file.first_row_index == 0 {
            return Err(GenstarError::input_load(&file.path, "a header row is required"));
        }

        let mut reader = ReaderBuilder::new()
            .delimiter(file.separator as u8)
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_path(&file.path)
            .map_err(|e| GenstarError::input_load(&file.path, e.to_string()))?;
        let records: Vec<StringRecord> = reader
            .records()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| GenstarError::input_load(&file.path, e.to_string()))?;

        if records.len() < file.first_row_index {
            return Err(GenstarError::input_load(&file.path, "missing header row"));
        }
        let strip = |record: &StringRecord| -> Vec<String> {
            record
                .iter()
                .skip(file.first_column_index)
                .map(str::to_string)
                .collect()
        };
        let header = strip(&records[file.first_row_index - 1]);
        let rows = records[file.first_row_index..]
            .iter()
            .map(strip)
            .filter(|row| row.iter().any(|cell| !cell.is_empty()))
            .collect();
        Ok(Self { header, rows })
    }

    /// Columns naming a dimension attribute of `attributes`.
    fn columns_of<'a>(&self, attributes: &'a AttributeDictionary) -> Vec<(usize, &'a Attribute)> {
        self.header
            .iter()
            .enumerate()
            .filter_map(|(i, name)| {
                attributes
                    .get(name)
                    .filter(|a| !a.is_record())
                    .map(|a| (i, a))
            })
            .collect()
    }
}

fn parse_values(
    row: &[String],
    columns: &[(usize, &Attribute)],
    file: &SurveyFile,
) -> Result<IndexMap<String, Value>> {
    let mut values = IndexMap::with_capacity(columns.len());
    for (column, attribute) in columns {
        let label = row.get(*column).map(String::as_str).unwrap_or_default();
        let value = if label.is_empty() {
            Value::Empty
        } else {
            attribute.value_of(label).cloned().ok_or_else(|| {
                GenstarError::input_load(
                    &file.path,
                    format!("'{label}' is not a value of attribute '{}'", attribute.name()),
                )
            })?
        };
        values.insert(attribute.name().to_string(), value);
    }
    Ok(values)
}

// Value indices of `label` in the dimension owning `attribute`: one index for
// a direct attribute, every mapped referent value for a mapped one.
fn dimension_indices(
    attribute: &Attribute,
    label: &str,
    attributes: &AttributeDictionary,
    file: &SurveyFile,
) -> Result<Vec<usize>> {
    let unknown = || {
        GenstarError::input_load(
            &file.path,
            format!("'{label}' is not a value of attribute '{}'", attribute.name()),
        )
    };
    if !attribute.is_mapped() {
        return attribute.index_of(label).map(|i| vec![i]).ok_or_else(unknown);
    }
    let referent = attributes.dimension_for(attribute.name()).ok_or_else(unknown)?;
    let labels = attribute.referent_labels(label).ok_or_else(unknown)?;
    labels
        .iter()
        .map(|l| referent.index_of(l).ok_or_else(unknown))
        .collect()
}

fn cartesian(expansions: &[Vec<usize>]) -> Vec<Vec<usize>> {
    expansions.iter().fold(vec![Vec::new()], |acc, options| {
        acc.iter()
            .flat_map(|prefix| {
                options.iter().map(move |&o| {
                    let mut coord = prefix.clone();
                    coord.push(o);
                    coord
                })
            })
            .collect()
    })
}
