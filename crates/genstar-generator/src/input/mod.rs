//! Survey file descriptors, loaded tables and the loader contract.

mod csv_loader;

pub use csv_loader::CsvSurveyLoader;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use genstar_core::{AttributeDictionary, ConfigurationError, Population, Result};

/// Kind of survey file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurveyType {
    /// Absolute counts.
    ContingencyTable,
    /// Frequencies over the whole population.
    GlobalFrequencyTable,
    /// Frequencies conditional on the first dimension.
    LocalFrequencyTable,
    /// Micro-data, one row per entity.
    Sample,
}

const SURVEY_TYPES: &[(SurveyType, &[&str])] = &[
    (
        SurveyType::ContingencyTable,
        &["contingency table", "contingencytable", "contingency", "contingency_table"],
    ),
    (
        SurveyType::GlobalFrequencyTable,
        &[
            "global frequency table",
            "globalfrequencytable",
            "frequency",
            "global_frequency_table",
            "frequency table",
            "frequencytable",
            "global frequency",
        ],
    ),
    (
        SurveyType::LocalFrequencyTable,
        &[
            "local frequency table",
            "localfrequencytable",
            "local",
            "local_frequency_table",
            "localfrequency",
            "local frequency",
        ],
    ),
    (
        SurveyType::Sample,
        &[
            "sample",
            "micro data",
            "microdata",
            "micro_data",
            "micro sample",
            "microsample",
        ],
    ),
];

impl SurveyType {
    /// Resolves a survey type name or alias, ignoring ASCII case.
    pub fn resolve(name: &str) -> std::result::Result<Self, ConfigurationError> {
        SURVEY_TYPES
            .iter()
            .find(|(_, aliases)| aliases.iter().any(|a| a.eq_ignore_ascii_case(name)))
            .map(|(t, _)| *t)
            .ok_or_else(|| ConfigurationError::UnknownSurveyType(name.to_string()))
    }

    pub fn is_table(&self) -> bool {
        !matches!(self, SurveyType::Sample)
    }
}

impl fmt::Display for SurveyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = SURVEY_TYPES
            .iter()
            .find(|(t, _)| t == self)
            .and_then(|(_, aliases)| aliases.first())
            .copied()
            .unwrap_or("survey");
        f.write_str(name)
    }
}

/// A survey file declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyFile {
    pub path: PathBuf,
    pub survey_type: SurveyType,
    pub separator: char,
    /// Number of header rows; the last one names the columns.
    pub first_row_index: usize,
    /// Number of leading columns skipped on every row.
    pub first_column_index: usize,
}

impl SurveyFile {
    pub fn new(path: impl Into<PathBuf>, survey_type: SurveyType) -> Self {
        Self {
            path: path.into(),
            survey_type,
            separator: ',',
            first_row_index: 1,
            first_column_index: 0,
        }
    }

    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    pub fn with_offsets(mut self, first_row_index: usize, first_column_index: usize) -> Self {
        self.first_row_index = first_row_index;
        self.first_column_index = first_column_index;
        self
    }
}

/// A loaded aggregate table in long layout.
///
/// Cells are keyed by value indices, one per dimension, in the value space
/// of the dimension attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct DataTable {
    pub source: PathBuf,
    pub survey_type: SurveyType,
    pub dimensions: Vec<String>,
    pub cells: BTreeMap<Vec<usize>, f64>,
}

impl DataTable {
    /// Sum of all cells.
    pub fn total(&self) -> f64 {
        self.cells.values().sum()
    }

    pub fn position(&self, dimension: &str) -> Option<usize> {
        self.dimensions.iter().position(|d| d == dimension)
    }

    /// Sums the cells onto the given subset of dimensions.
    ///
    /// `keep` holds positions into [`dimensions`](Self::dimensions).
    pub fn project(&self, keep: &[usize]) -> BTreeMap<Vec<usize>, f64> {
        let mut projected = BTreeMap::new();
        for (coord, value) in &self.cells {
            let key: Vec<usize> = keep.iter().map(|&i| coord[i]).collect();
            *projected.entry(key).or_insert(0.0) += value;
        }
        projected
    }
}

/// Reads survey files.
///
/// Any read or parse failure is an [`InputLoad`](genstar_core::GenstarError::InputLoad)
/// error and aborts the generation.
pub trait SurveyLoader {
    /// Loads every aggregate table among `files`, in declaration order.
    fn load_tables(
        &self,
        files: &[SurveyFile],
        attributes: &AttributeDictionary,
    ) -> Result<Vec<DataTable>>;

    /// Loads one population per sample file, in declaration order.
    fn load_samples(
        &self,
        files: &[SurveyFile],
        attributes: &AttributeDictionary,
    ) -> Result<Vec<Population>>;

    /// Loads one two level population per sample file: rows sharing the
    /// same `household_key` value become members of one household.
    fn load_multilayer_samples(
        &self,
        files: &[SurveyFile],
        households: &AttributeDictionary,
        individuals: &AttributeDictionary,
        household_key: &str,
    ) -> Result<Vec<Population>>;
}
